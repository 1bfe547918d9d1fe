//! Frame pipeline over a panel's renderables.
//!
//! DESIGN
//! ======
//! `SceneEngine` keeps one [`Renderable`] per live object, keyed by id, and
//! drives a frame in three phases:
//!
//! 1. prepare every renderable (fresh snapshot, talking link, placement)
//! 2. collect placements into a read-only [`PlacementMap`]
//! 3. render in draw order: primary order, then overlay order
//!
//! Hit tests walk the same order backwards so the topmost object wins.
//!
//! ERROR HANDLING
//! ==============
//! One object's failure never aborts the frame. Failures are logged at
//! `warn` and collected in the returned [`FrameReport`]; the object's cache
//! is empty again and the next frame retries it.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::{EngineConfig, RenderPass};
use crate::error::RenderError;
use crate::geom::Point;
use crate::painter::PainterRegistry;
use crate::renderable::{PlacementMap, RenderConfig, RenderOutcome, Renderable};
use crate::scene::{ObjectId, Panel};
use crate::selection::Selection;
use crate::surface::DrawTarget;

/// What happened during one `render_frame`.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Objects drawn from a reused surface.
    pub reused: usize,
    /// Objects whose surface was repainted.
    pub refreshed: usize,
    /// Objects painted straight onto the destination.
    pub direct: usize,
    /// Zero-size objects skipped.
    pub empty: usize,
    /// Objects without a registered painter.
    pub unpainted: usize,
    pub failed: Vec<(ObjectId, RenderError)>,
}

impl FrameReport {
    /// Objects that reached the destination.
    #[must_use]
    pub fn drawn(&self) -> usize {
        self.reused + self.refreshed + self.direct
    }

    fn record(&mut self, outcome: RenderOutcome) {
        match outcome {
            RenderOutcome::Reused => self.reused += 1,
            RenderOutcome::Refreshed => self.refreshed += 1,
            RenderOutcome::Direct => self.direct += 1,
            RenderOutcome::Empty => self.empty += 1,
        }
    }
}

/// Owns the renderables of one panel.
pub struct SceneEngine {
    config: EngineConfig,
    painters: PainterRegistry,
    renderables: HashMap<ObjectId, Renderable>,
}

impl SceneEngine {
    #[must_use]
    pub fn new(config: EngineConfig, painters: PainterRegistry) -> Self {
        Self {
            config,
            painters,
            renderables: HashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn renderable(&self, id: &ObjectId) -> Option<&Renderable> {
        self.renderables.get(id)
    }

    /// Live renderables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.renderables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.renderables.is_empty()
    }

    /// Create renderables for new objects and dispose those whose object
    /// left the panel, changed kind, or was disposed elsewhere.
    pub fn sync(&mut self, panel: &Panel) {
        self.renderables.retain(|id, renderable| {
            let keep = !renderable.is_disposed()
                && panel.get(id).is_some_and(|obj| obj.kind == renderable.object().kind);
            if !keep {
                renderable.dispose();
                debug!(id = %id, "renderable dropped");
            }
            keep
        });

        for id in panel.draw_order() {
            if self.renderables.contains_key(id) {
                continue;
            }
            let Some(obj) = panel.get(id) else {
                continue;
            };
            let Some(painter) = self.painters.get(obj.kind) else {
                continue;
            };
            let config = RenderConfig::for_kind(obj.kind, &self.config);
            self.renderables.insert(*id, Renderable::new(obj.clone(), config, painter));
            debug!(id = %id, kind = ?obj.kind, "renderable created");
        }
    }

    /// Draw one frame of `panel` onto `target`.
    pub async fn render_frame(
        &mut self,
        panel: &Panel,
        target: &mut dyn DrawTarget,
        pass: &RenderPass,
        selection: &Selection,
    ) -> FrameReport {
        self.sync(panel);
        let mut report = FrameReport::default();

        for id in panel.draw_order() {
            let (Some(obj), Some(renderable)) = (panel.get(id), self.renderables.get_mut(id)) else {
                continue;
            };
            if let Err(err) = renderable.prepare(obj, panel) {
                warn!(id = %id, error = %err, "prepare failed");
                report.failed.push((*id, err));
            }
        }

        let placements: PlacementMap = self
            .renderables
            .iter()
            .map(|(id, renderable)| (*id, renderable.placement()))
            .collect();

        for id in panel.draw_order() {
            if panel.get(id).is_none() {
                continue;
            }
            let Some(renderable) = self.renderables.get_mut(id) else {
                report.unpainted += 1;
                continue;
            };
            if renderable.is_disposed() {
                continue;
            }
            match renderable.render(target, pass, &placements, selection.state_of(id)).await {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    warn!(id = %id, error = %err, "render failed");
                    report.failed.push((*id, err));
                }
            }
        }

        debug!(
            drawn = report.drawn(),
            refreshed = report.refreshed,
            failed = report.failed.len(),
            "frame rendered"
        );
        report
    }

    /// Topmost object whose painted pixels cover `point`.
    pub fn hit_test(&mut self, panel: &Panel, point: Point) -> Option<ObjectId> {
        for id in panel.draw_order().rev() {
            let Some(renderable) = self.renderables.get_mut(id) else {
                continue;
            };
            match renderable.hit_test(point) {
                Ok(true) => return Some(*id),
                Ok(false) => {}
                Err(err) => warn!(id = %id, error = %err, "hit test failed"),
            }
        }
        None
    }

    /// Dispose every renderable.
    pub fn teardown(&mut self) {
        let count = self.renderables.len();
        for renderable in self.renderables.values_mut() {
            renderable.dispose();
        }
        self.renderables.clear();
        info!(count, "engine torn down");
    }
}
