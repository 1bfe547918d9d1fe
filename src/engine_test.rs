use std::sync::Arc;

use super::*;
use crate::config::DebugHitboxes;
use crate::painter::{FillPainter, LocalPainter};
use crate::scene::{ObjectKind, SceneObject};
use crate::surface::{Color, DrawCall, RecordingTarget};

const EPSILON: f64 = 1e-9;

struct BrokenPainter;

#[async_trait::async_trait]
impl LocalPainter for BrokenPainter {
    async fn paint(&self, _obj: &SceneObject, _target: &mut dyn DrawTarget, _hq: bool) -> Result<(), RenderError> {
        Err(RenderError::Paint("font missing".into()))
    }
}

fn painters() -> PainterRegistry {
    let mut registry = PainterRegistry::new();
    let fill: Arc<dyn LocalPainter> = Arc::new(FillPainter { color: Color::RED });
    for kind in [ObjectKind::Sprite, ObjectKind::Character, ObjectKind::TextBox, ObjectKind::Background] {
        registry.register(kind, Arc::clone(&fill));
    }
    registry.register(ObjectKind::Notification, Arc::new(BrokenPainter));
    registry
}

fn engine() -> SceneEngine {
    let config = EngineConfig { screen_width: 64, screen_height: 36, ..EngineConfig::default() };
    SceneEngine::new(config, painters())
}

fn sprite(x: f64, y: f64) -> SceneObject {
    SceneObject::new(ObjectKind::Sprite, x, y, 20.0, 20.0)
}

fn image_widths(target: &RecordingTarget) -> Vec<u32> {
    target
        .calls()
        .iter()
        .filter_map(|call| match call {
            DrawCall::Image(image) => Some(image.image_width),
            DrawCall::Rect { .. } | DrawCall::Path { .. } => None,
        })
        .collect()
}

async fn frame(engine: &mut SceneEngine, panel: &Panel, target: &mut RecordingTarget) -> FrameReport {
    engine.render_frame(panel, target, &RenderPass::export(), &Selection::new()).await
}

// =============================================================
// sync
// =============================================================

#[test]
fn sync_tracks_panel_membership() {
    let mut engine = engine();
    let mut panel = Panel::new();
    let a = sprite(10.0, 10.0);
    let b = sprite(50.0, 10.0);
    let (a_id, b_id) = (a.id, b.id);
    panel.insert(a);
    panel.insert(b);

    engine.sync(&panel);
    assert_eq!(engine.len(), 2);

    panel.remove(&a_id);
    engine.sync(&panel);
    assert_eq!(engine.len(), 1);
    assert!(engine.renderable(&a_id).is_none());
    assert!(engine.renderable(&b_id).is_some());
}

#[test]
fn sync_skips_kinds_without_painter() {
    let mut engine = engine();
    let mut panel = Panel::new();
    panel.insert(SceneObject::new(ObjectKind::Poem, 0.0, 0.0, 10.0, 10.0));
    engine.sync(&panel);
    assert!(engine.is_empty());
}

#[test]
fn sync_recreates_on_kind_change() {
    let mut engine = engine();
    let mut panel = Panel::new();
    let obj = sprite(10.0, 10.0);
    let id = obj.id;
    panel.insert(obj);
    engine.sync(&panel);
    let handle = engine.renderable(&id).map(Renderable::dispose_handle);

    if let Some(obj) = panel.get_mut(&id) {
        obj.kind = ObjectKind::Character;
    }
    engine.sync(&panel);
    assert!(handle.is_some_and(|h| h.is_disposed()));
    assert_eq!(engine.renderable(&id).map(|r| r.object().kind), Some(ObjectKind::Character));
}

#[test]
fn sync_replaces_externally_disposed_renderable() {
    let mut engine = engine();
    let mut panel = Panel::new();
    let obj = sprite(10.0, 10.0);
    let id = obj.id;
    panel.insert(obj);
    engine.sync(&panel);
    engine.renderable(&id).map(Renderable::dispose_handle).unwrap().dispose();

    engine.sync(&panel);
    assert!(!engine.renderable(&id).unwrap().is_disposed());
}

// =============================================================
// render_frame
// =============================================================

#[tokio::test]
async fn frame_draws_primary_then_overlay_order() {
    let mut engine = engine();
    let mut panel = Panel::new();
    let overlay = SceneObject::new(ObjectKind::TextBox, 0.0, 0.0, 30.0, 10.0);
    panel.insert_on_top(overlay);
    panel.insert(SceneObject::new(ObjectKind::Sprite, 0.0, 0.0, 10.0, 10.0));
    panel.insert(SceneObject::new(ObjectKind::Sprite, 0.0, 0.0, 20.0, 10.0));

    let mut target = RecordingTarget::new();
    let report = frame(&mut engine, &panel, &mut target).await;
    assert_eq!(report.refreshed, 3);
    assert_eq!(report.drawn(), 3);
    assert_eq!(image_widths(&target), vec![10, 20, 30]);
}

#[tokio::test]
async fn second_frame_reuses_surfaces() {
    let mut engine = engine();
    let mut panel = Panel::new();
    panel.insert(sprite(10.0, 10.0));
    panel.insert(sprite(40.0, 10.0));

    let mut target = RecordingTarget::new();
    frame(&mut engine, &panel, &mut target).await;
    let report = frame(&mut engine, &panel, &mut target).await;
    assert_eq!(report.reused, 2);
    assert_eq!(report.refreshed, 0);
}

#[tokio::test]
async fn failing_object_does_not_abort_siblings() {
    let mut engine = engine();
    let mut panel = Panel::new();
    let broken = SceneObject::new(ObjectKind::Notification, 0.0, 0.0, 10.0, 10.0);
    let broken_id = broken.id;
    panel.insert(sprite(10.0, 10.0));
    panel.insert(broken);
    panel.insert(sprite(40.0, 10.0));
    panel.insert(SceneObject::new(ObjectKind::Poem, 0.0, 0.0, 10.0, 10.0));

    let mut target = RecordingTarget::new();
    let report = frame(&mut engine, &panel, &mut target).await;
    assert_eq!(report.drawn(), 2);
    assert_eq!(report.unpainted, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, broken_id);
    assert_eq!(report.failed[0].1, RenderError::Paint("font missing".into()));
}

#[tokio::test]
async fn zero_size_objects_are_counted_empty() {
    let mut engine = engine();
    let mut panel = Panel::new();
    panel.insert(SceneObject::new(ObjectKind::Sprite, 0.0, 0.0, 0.0, 0.0));
    let mut target = RecordingTarget::new();
    let report = frame(&mut engine, &panel, &mut target).await;
    assert_eq!(report.empty, 1);
    assert!(target.calls().is_empty());
}

#[tokio::test]
async fn linked_child_follows_parent_placement() {
    let mut engine = engine();
    let mut panel = Panel::new();
    let parent = SceneObject::new(ObjectKind::Character, 100.0, 50.0, 20.0, 20.0);
    let mut child = SceneObject::new(ObjectKind::Character, 10.0, 0.0, 20.0, 10.0);
    child.linked_to = Some(parent.id);
    let (parent_id, child_id) = (parent.id, child.id);
    panel.insert(parent);
    panel.insert(child);

    let mut target = RecordingTarget::new();
    frame(&mut engine, &panel, &mut target).await;

    let parent_placement = engine.renderable(&parent_id).unwrap().placement();
    let child_placement = engine.renderable(&child_id).unwrap().placement();
    let DrawCall::Image(image) = &target.calls()[1] else {
        panic!("expected image call");
    };
    assert!(image.transform.approx_eq(&parent_placement.multiply(&child_placement), EPSILON));
}

#[tokio::test]
async fn selection_reaches_renderables() {
    let mut engine = engine();
    let mut panel = Panel::new();
    let obj = sprite(10.0, 10.0);
    let id = obj.id;
    panel.insert(obj);
    let mut selection = Selection::new();
    selection.select(id);

    let mut target = RecordingTarget::new();
    engine
        .render_frame(&panel, &mut target, &RenderPass::preview(DebugHitboxes::Selected), &selection)
        .await;
    let shadows: Vec<_> = target
        .calls()
        .iter()
        .filter_map(|call| match call {
            DrawCall::Image(image) => image.shadow.map(|s| s.color),
            DrawCall::Rect { .. } | DrawCall::Path { .. } => None,
        })
        .collect();
    assert_eq!(shadows, vec![Color::RED]);
    assert!(target.calls().iter().any(|call| matches!(call, DrawCall::Rect { .. })));
}

// =============================================================
// hit_test / teardown
// =============================================================

#[tokio::test]
async fn hit_test_returns_topmost_object() {
    let mut engine = engine();
    let mut panel = Panel::new();
    let lower = sprite(50.0, 50.0);
    let upper = sprite(55.0, 50.0);
    let (lower_id, upper_id) = (lower.id, upper.id);
    panel.insert(lower);
    panel.insert(upper);

    let mut target = RecordingTarget::new();
    frame(&mut engine, &panel, &mut target).await;

    assert_eq!(engine.hit_test(&panel, Point::new(52.0, 55.0)), Some(upper_id));
    assert_eq!(engine.hit_test(&panel, Point::new(42.0, 55.0)), Some(lower_id));
    assert_eq!(engine.hit_test(&panel, Point::new(0.0, 0.0)), None);
}

#[tokio::test]
async fn hit_test_before_first_frame_misses() {
    let mut engine = engine();
    let mut panel = Panel::new();
    panel.insert(sprite(50.0, 50.0));
    engine.sync(&panel);
    assert_eq!(engine.hit_test(&panel, Point::new(50.0, 55.0)), None);
}

#[tokio::test]
async fn teardown_disposes_everything() {
    let mut engine = engine();
    let mut panel = Panel::new();
    let obj = sprite(50.0, 50.0);
    let id = obj.id;
    panel.insert(obj);
    let mut target = RecordingTarget::new();
    frame(&mut engine, &panel, &mut target).await;
    let handle = engine.renderable(&id).map(Renderable::dispose_handle).unwrap();

    engine.teardown();
    assert!(engine.is_empty());
    assert!(handle.is_disposed());
    assert_eq!(engine.hit_test(&panel, Point::new(50.0, 55.0)), None);
}
