//! Local painters: the per-kind routines that draw an object into its local
//! surface (or straight onto the destination on the skip-local path).
//!
//! Concrete sprite, background and text box painters live with the
//! application. This module defines the seam, a registry keyed by
//! [`ObjectKind`], and two generic painters used by the probe CLI and tests.

#[cfg(test)]
#[path = "painter_test.rs"]
mod painter_test;

use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::AssetResolver;
use crate::error::RenderError;
use crate::scene::{ObjectKind, SceneObject};
use crate::surface::{Color, DrawTarget, ImageDraw, RectDraw};

/// Draws one object in its local coordinate space. `(0, 0)` is the top-left
/// of the object's declared `width × height` box, or of the screen for
/// full-canvas objects.
#[async_trait::async_trait]
pub trait LocalPainter: Send + Sync {
    /// Paint `obj` onto `target`. `hq` selects high-quality assets.
    ///
    /// # Errors
    ///
    /// A failure aborts this object's draw for the frame only.
    async fn paint(&self, obj: &SceneObject, target: &mut dyn DrawTarget, hq: bool) -> Result<(), RenderError>;
}

/// Painters by object kind.
#[derive(Default, Clone)]
pub struct PainterRegistry {
    painters: HashMap<ObjectKind, Arc<dyn LocalPainter>>,
}

impl PainterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `painter` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: ObjectKind, painter: Arc<dyn LocalPainter>) {
        self.painters.insert(kind, painter);
    }

    #[must_use]
    pub fn get(&self, kind: ObjectKind) -> Option<Arc<dyn LocalPainter>> {
        self.painters.get(&kind).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.painters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.painters.is_empty()
    }
}

/// Fills the object's box with one color.
pub struct FillPainter {
    pub color: Color,
}

#[async_trait::async_trait]
impl LocalPainter for FillPainter {
    async fn paint(&self, obj: &SceneObject, target: &mut dyn DrawTarget, _hq: bool) -> Result<(), RenderError> {
        target.draw_rect(&RectDraw::filled(0.0, 0.0, obj.width, obj.height, self.color))
    }
}

/// Draws a single resolved asset stretched over the object's box.
pub struct AssetPainter {
    pub resolver: Arc<dyn AssetResolver>,
    pub key: String,
}

#[async_trait::async_trait]
impl LocalPainter for AssetPainter {
    async fn paint(&self, obj: &SceneObject, target: &mut dyn DrawTarget, hq: bool) -> Result<(), RenderError> {
        let image = self.resolver.resolve(&self.key, hq).await;
        target.draw_image(&image, &ImageDraw::at(0.0, 0.0, obj.width, obj.height))
    }
}
