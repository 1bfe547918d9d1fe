//! One scene object's render unit.
//!
//! DESIGN
//! ======
//! A `Renderable` owns the object's local surface cache and hit state and is
//! driven by the engine through `prepare → render → hit_test → dispose`.
//! Object categories differ only in a [`Variant`] tag:
//!
//! - `Offscreen`: surface of the object's size, drawn into a top-centered
//!   rect (scaled by zoom and talk enlarge), rotated about its middle-left
//!   anchor. Sprites, text boxes, choices, notifications, poems.
//! - `Transformed`: surface of the object's size, drawn at the origin under
//!   `link · placement`. Characters.
//! - `FullCanvas`: surface of the screen's size; the placement is applied
//!   while painting and the surface is drawn untransformed. Backgrounds.
//!
//! Linked objects compose their parent's placement, read from the per-frame
//! [`PlacementMap`], in front of their own destination transform.
//!
//! ERROR HANDLING
//! ==============
//! Paint and allocation failures are returned to the engine and leave the
//! cache empty. Any call after `dispose` returns [`RenderError::Disposed`].
//! A dispose that lands while the painter is suspended is observed when the
//! painter returns; the half-painted surface is discarded.

#[cfg(test)]
#[path = "renderable_test.rs"]
mod renderable_test;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error};

use crate::cache::{CacheKey, CacheState, LocalCache, RefreshRequest, SurfaceSize};
use crate::config::{EngineConfig, RenderPass};
use crate::consts::{DEBUG_HITBOX_OUTLINE, DEBUG_MARKER_SIZE, TALK_ENLARGE_SCALE};
use crate::error::RenderError;
use crate::geom::{Affine, Point, Size, rotate_around};
use crate::hit::{DrawRect, HitGeometry, HitTester, Hitbox};
use crate::painter::LocalPainter;
use crate::scene::{CompositeMode, ObjectId, ObjectKind, Panel, SceneObject};
use crate::selection::SelectedState;
use crate::surface::{Color, DrawTarget, ImageDraw, Outline, RectDraw, scoped};
use crate::talk::resolve_talking;
use crate::transform::compute_transform;

/// Placements computed during prepare, keyed by object id.
pub type PlacementMap = HashMap<ObjectId, Affine>;

// =============================================================
// DisposeHandle
// =============================================================

/// Shared disposal flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct DisposeHandle(Arc<AtomicBool>);

impl DisposeHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispose(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================
// Variant / config
// =============================================================

/// How the local surface maps onto the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Offscreen,
    Transformed,
    FullCanvas { width: u32, height: u32 },
}

/// Static per-renderable settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    pub variant: Variant,
    /// Whether the painter may draw straight onto the destination.
    pub allow_skip_local: bool,
    pub max_surface_side: u32,
}

impl RenderConfig {
    /// Settings for an object of `kind`.
    #[must_use]
    pub fn for_kind(kind: ObjectKind, config: &EngineConfig) -> Self {
        let variant = match kind {
            ObjectKind::Background => Variant::FullCanvas {
                width: config.screen_width,
                height: config.screen_height,
            },
            ObjectKind::Character => Variant::Transformed,
            ObjectKind::Sprite
            | ObjectKind::TextBox
            | ObjectKind::Choice
            | ObjectKind::Notification
            | ObjectKind::Poem => Variant::Offscreen,
        };
        Self {
            variant,
            allow_skip_local: true,
            max_surface_side: config.max_surface_side,
        }
    }
}

/// What a `render` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Drew the cached surface as is.
    Reused,
    /// Repainted the local surface, then drew it.
    Refreshed,
    /// Painted straight onto the destination.
    Direct,
    /// Nothing to draw (zero size).
    Empty,
}

// =============================================================
// Renderable
// =============================================================

pub struct Renderable {
    obj: SceneObject,
    config: RenderConfig,
    painter: Arc<dyn LocalPainter>,
    cache: LocalCache,
    hit: HitTester,
    talking: Option<ObjectId>,
    placement: Affine,
    link: Affine,
    renderable: bool,
    last_hq: bool,
    disposed: DisposeHandle,
}

impl Renderable {
    #[must_use]
    pub fn new(obj: SceneObject, config: RenderConfig, painter: Arc<dyn LocalPainter>) -> Self {
        let cache = LocalCache::new(config.max_surface_side);
        let mut renderable = Self {
            obj,
            config,
            painter,
            cache,
            hit: HitTester::new(),
            talking: None,
            placement: Affine::IDENTITY,
            link: Affine::IDENTITY,
            renderable: false,
            last_hq: false,
            disposed: DisposeHandle::new(),
        };
        renderable.update_placement();
        renderable
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.obj.id
    }

    #[must_use]
    pub fn object(&self) -> &SceneObject {
        &self.obj
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// A handle that disposes this renderable from elsewhere, e.g. while its
    /// render is suspended in the painter.
    #[must_use]
    pub fn dispose_handle(&self) -> DisposeHandle {
        self.disposed.clone()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    /// Text box voicing this object, as of the last prepare.
    #[must_use]
    pub fn talking(&self) -> Option<ObjectId> {
        self.talking
    }

    /// Placement computed by the last prepare.
    #[must_use]
    pub fn placement(&self) -> Affine {
        self.placement
    }

    /// Whether the object has a drawable size.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        self.renderable
    }

    #[must_use]
    pub fn in_hit_fallback(&self) -> bool {
        self.hit.in_fallback()
    }

    #[must_use]
    pub fn surface_allocations(&self) -> u64 {
        self.cache.allocations()
    }

    #[must_use]
    pub fn cache_state(&self) -> CacheState {
        if self.disposed.is_disposed() {
            return CacheState::Disposed;
        }
        self.cache.state(&self.cache_key(self.last_hq))
    }

    #[must_use]
    pub fn needs_redraw(&self, hq: bool) -> bool {
        self.cache.needs_redraw(&self.cache_key(hq))
    }

    /// Take a fresh snapshot of the object, resolve its talking link and
    /// compute its placement.
    ///
    /// # Errors
    ///
    /// [`RenderError::Disposed`] after `dispose`.
    pub fn prepare(&mut self, obj: &SceneObject, panel: &Panel) -> Result<(), RenderError> {
        self.ensure_live()?;
        self.obj.clone_from(obj);
        self.talking = resolve_talking(panel, &self.obj.id);
        self.update_placement();
        Ok(())
    }

    /// Draw the object onto `target`, repainting the local surface first
    /// when it is stale.
    ///
    /// # Errors
    ///
    /// - [`RenderError::Disposed`] after `dispose`, or when disposed while
    ///   the painter was running.
    /// - Allocation and paint failures; the cache is left empty.
    pub async fn render(
        &mut self,
        target: &mut dyn DrawTarget,
        pass: &RenderPass,
        placements: &PlacementMap,
        selection: SelectedState,
    ) -> Result<RenderOutcome, RenderError> {
        self.ensure_live()?;
        self.last_hq = pass.hq;
        if !self.renderable {
            return Ok(RenderOutcome::Empty);
        }
        self.link = self.resolve_link(placements);

        let outcome = if self.can_skip_local(pass, selection) {
            self.paint_direct(target, pass.hq).await?;
            RenderOutcome::Direct
        } else {
            let key = self.cache_key(pass.hq);
            let outcome = if self.cache.needs_redraw(&key) {
                let request = RefreshRequest {
                    key,
                    transform: match self.config.variant {
                        Variant::FullCanvas { .. } => Some(self.placement),
                        Variant::Offscreen | Variant::Transformed => None,
                    },
                };
                self.cache.refresh(self.painter.as_ref(), &self.obj, request, &self.disposed).await?;
                debug!(id = %self.obj.id, version = self.obj.version, hq = pass.hq, "local surface refreshed");
                RenderOutcome::Refreshed
            } else {
                RenderOutcome::Reused
            };
            self.draw_cached(target, pass, selection)?;
            outcome
        };

        if pass.debug_hitboxes.shows(selection) {
            self.draw_debug(target)?;
        }
        Ok(outcome)
    }

    /// Whether `point` (destination coordinates) lands on a painted pixel.
    ///
    /// # Errors
    ///
    /// [`RenderError::Disposed`] after `dispose`.
    pub fn hit_test(&mut self, point: Point) -> Result<bool, RenderError> {
        self.ensure_live()?;
        if !self.renderable {
            return Ok(false);
        }
        let point = match self.config.variant {
            Variant::Offscreen => match self.link.invert() {
                Some(inverse) => inverse.transform_point(point),
                None => return Ok(false),
            },
            Variant::Transformed | Variant::FullCanvas { .. } => point,
        };
        let geometry = self.hit_geometry();
        let surface = self.cache.valid_surface(self.obj.version);
        Ok(self.hit.test(&geometry, point, surface))
    }

    /// Release the local surface. Safe to call more than once.
    pub fn dispose(&mut self) {
        if !self.disposed.is_disposed() {
            debug!(id = %self.obj.id, "renderable disposed");
        }
        self.disposed.dispose();
        self.cache.dispose();
    }

    fn ensure_live(&self) -> Result<(), RenderError> {
        if self.disposed.is_disposed() {
            error!(id = %self.obj.id, "renderable used after dispose");
            return Err(RenderError::Disposed { id: self.obj.id });
        }
        Ok(())
    }

    // =============================================================
    // Geometry
    // =============================================================

    fn update_placement(&mut self) {
        let local = match self.config.variant {
            Variant::FullCanvas { width, height } => Some(Size::new(f64::from(width), f64::from(height))),
            Variant::Offscreen | Variant::Transformed => None,
        };
        self.placement = compute_transform(&self.obj, self.talking.is_some(), local);
        self.renderable = !(self.obj.width == 0.0 && self.obj.height == 0.0);
    }

    fn surface_size(&self) -> SurfaceSize {
        match self.config.variant {
            Variant::FullCanvas { width, height } => SurfaceSize::new(width, height),
            Variant::Offscreen | Variant::Transformed => SurfaceSize::from_logical(self.obj.width, self.obj.height),
        }
    }

    fn cache_key(&self, hq: bool) -> CacheKey {
        CacheKey {
            version: self.obj.version,
            hq,
            size: self.surface_size(),
        }
    }

    fn resolve_link(&self, placements: &PlacementMap) -> Affine {
        if let Variant::FullCanvas { .. } = self.config.variant {
            return Affine::IDENTITY;
        }
        self.obj
            .linked_to
            .and_then(|parent| placements.get(&parent).copied())
            .unwrap_or(Affine::IDENTITY)
    }

    fn talk_scale(&self) -> f64 {
        if self.talking.is_some() && self.obj.enlarge_when_talking {
            TALK_ENLARGE_SCALE
        } else {
            1.0
        }
    }

    /// Offscreen draw rect: top-centered on `(x, y)`, scaled by zoom and
    /// talk enlarge.
    fn draw_rect(&self) -> DrawRect {
        let scale = self.obj.zoom * self.talk_scale();
        let w = self.obj.width * scale;
        let h = self.obj.height * scale;
        DrawRect { x: self.obj.x - w / 2.0, y: self.obj.y, w, h }
    }

    /// Offscreen rotation: angle in radians (negated when flipped) and anchor.
    fn rotation(&self) -> (f64, Point) {
        let rad = self.obj.rotation.to_radians();
        let angle = if self.obj.flip { -rad } else { rad };
        let draw = self.draw_rect();
        (angle, Point::new(self.obj.x, draw.y + draw.h / 2.0))
    }

    /// Maps surface pixels onto the destination.
    fn surface_transform(&self) -> Affine {
        let size = self.surface_size();
        let (sw, sh) = (f64::from(size.width.max(1)), f64::from(size.height.max(1)));
        match self.config.variant {
            Variant::Offscreen => {
                let draw = self.draw_rect();
                let (angle, anchor) = self.rotation();
                let mut m = self.link.rotate_about(anchor, angle).translate(draw.x, draw.y);
                if self.obj.flip {
                    m = m.translate(draw.w, 0.0).flip_x();
                }
                m.scale(draw.w / sw, draw.h / sh)
            }
            Variant::Transformed => self
                .link
                .multiply(&self.placement)
                .scale(self.obj.width / sw, self.obj.height / sh),
            Variant::FullCanvas { .. } => Affine::IDENTITY,
        }
    }

    fn hit_geometry(&self) -> HitGeometry {
        match self.config.variant {
            Variant::Offscreen => {
                let (angle, anchor) = self.rotation();
                HitGeometry::Anchored {
                    hitbox: Hitbox::top_center(self.obj.x, self.obj.y, self.obj.width, self.obj.height),
                    angle,
                    anchor,
                    draw: self.draw_rect(),
                    flip: self.obj.flip,
                }
            }
            Variant::Transformed => {
                let size = self.surface_size();
                HitGeometry::Mapped {
                    inverse: self.surface_transform().invert(),
                    local: Size::new(f64::from(size.width), f64::from(size.height)),
                    sample_at_point: false,
                }
            }
            Variant::FullCanvas { width, height } => HitGeometry::Mapped {
                inverse: self.placement.invert(),
                local: Size::new(f64::from(width), f64::from(height)),
                sample_at_point: true,
            },
        }
    }

    // =============================================================
    // Drawing
    // =============================================================

    fn can_skip_local(&self, pass: &RenderPass, selection: SelectedState) -> bool {
        pass.skip_local
            && self.config.allow_skip_local
            && self.obj.filters.is_empty()
            && !self.obj.flip
            && self.obj.opacity >= 1.0
            && self.obj.composite == CompositeMode::SourceOver
            && selection.is_none()
            && !self.cache.has_surface()
    }

    /// Skip-local path: the painter draws onto the destination under the
    /// transform the cached surface would have been drawn with.
    async fn paint_direct(&mut self, target: &mut dyn DrawTarget, hq: bool) -> Result<(), RenderError> {
        let m = match self.config.variant {
            Variant::FullCanvas { .. } => self.placement,
            Variant::Offscreen | Variant::Transformed => self.surface_transform(),
        };
        let saved = target.transform();
        target.set_transform(saved.multiply(&m));
        let painted = self.painter.paint(&self.obj, target, hq).await;
        target.set_transform(saved);
        if self.disposed.is_disposed() {
            self.cache.dispose();
            return Err(RenderError::Disposed { id: self.obj.id });
        }
        painted
    }

    fn draw_cached(&self, target: &mut dyn DrawTarget, pass: &RenderPass, selection: SelectedState) -> Result<(), RenderError> {
        let Some(surface) = self.cache.surface() else {
            return Ok(());
        };
        let obj = &self.obj;
        let shadow = if pass.interactive { selection.highlight() } else { None };
        match self.config.variant {
            Variant::Offscreen => {
                let draw = self.draw_rect();
                let (rotation, anchor) = self.rotation();
                let params = ImageDraw {
                    x: draw.x,
                    y: draw.y,
                    w: draw.w,
                    h: draw.h,
                    rotation,
                    rotation_anchor: Some(anchor),
                    flip: obj.flip,
                    shadow,
                    composite: obj.composite,
                    filters: &obj.filters,
                    opacity: obj.opacity,
                };
                scoped(target, &self.link, |t| t.draw_image(surface, &params))
            }
            Variant::Transformed => {
                let params = ImageDraw {
                    shadow,
                    composite: obj.composite,
                    filters: &obj.filters,
                    opacity: obj.opacity,
                    ..ImageDraw::at(0.0, 0.0, obj.width, obj.height)
                };
                let m = self.link.multiply(&self.placement);
                scoped(target, &m, |t| t.draw_image(surface, &params))
            }
            Variant::FullCanvas { width, height } => {
                let params = ImageDraw {
                    shadow,
                    composite: obj.composite,
                    filters: &obj.filters,
                    opacity: obj.opacity,
                    ..ImageDraw::at(0.0, 0.0, f64::from(width), f64::from(height))
                };
                target.draw_image(surface, &params)
            }
        }
    }

    /// Hitbox outline, anchor markers and last sampled point.
    fn draw_debug(&self, target: &mut dyn DrawTarget) -> Result<(), RenderError> {
        let outline = Some(Outline { color: Color::BLACK, width: DEBUG_HITBOX_OUTLINE });
        match self.hit_geometry() {
            HitGeometry::Anchored { hitbox, angle, anchor, draw, .. } => {
                let rect = RectDraw {
                    x: hitbox.x0,
                    y: hitbox.y0,
                    w: hitbox.width(),
                    h: hitbox.height(),
                    fill: None,
                    outline,
                    rotation: angle,
                    rotation_anchor: Some(anchor),
                };
                // Zoom anchor: bottom-center of the drawn rect, rotated with it.
                let zoom = rotate_around(Point::new(self.obj.x, draw.y + draw.h), anchor, angle);
                scoped(target, &self.link, |t| {
                    t.draw_rect(&rect)?;
                    t.draw_rect(&marker(anchor, Color::MAGENTA, None))?;
                    t.draw_rect(&marker(zoom, Color::CYAN, None))
                })?;
            }
            HitGeometry::Mapped { local, sample_at_point, .. } => {
                let m = if sample_at_point { self.placement } else { self.surface_transform() };
                let rect = RectDraw {
                    outline,
                    fill: None,
                    ..RectDraw::filled(0.0, 0.0, local.width, local.height, Color::TRANSPARENT)
                };
                scoped(target, &m, |t| t.draw_rect(&rect))?;
            }
        }

        target.draw_rect(&marker(Point::new(self.obj.x, self.obj.y), Color::YELLOW, None))?;
        if let Some(last) = self.hit.last_hit() {
            let at = self.surface_transform().transform_point(last);
            let white = Some(Outline { color: Color::WHITE, width: 1.0 });
            target.draw_rect(&marker(at, Color::BLUE, white))?;
        }
        Ok(())
    }
}

fn marker(center: Point, fill: Color, outline: Option<Outline>) -> RectDraw {
    let half = (DEBUG_MARKER_SIZE - 1.0) / 2.0;
    RectDraw {
        outline,
        ..RectDraw::filled(center.x - half, center.y - half, DEBUG_MARKER_SIZE, DEBUG_MARKER_SIZE, fill)
    }
}
