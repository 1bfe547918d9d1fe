//! Per-object local surface cache.
//!
//! DESIGN
//! ======
//! A renderable paints its object once into a private [`Raster`] and reuses
//! that raster until the object's version, the quality flag or the surface
//! size changes. When a refresh keeps the size, the existing raster is
//! cleared and painted again in place; otherwise it is dropped and a new one
//! allocated. `allocations()` counts the latter.
//!
//! While the painter runs the raster is checked out of the cache, so a
//! half-painted surface is never visible to hit tests. It is installed only
//! after the painter returns and the owner has not been disposed meanwhile.
//!
//! ERROR HANDLING
//! ==============
//! Any failure (allocation, painter, disposal during the await) leaves the
//! cache `Empty`. The next frame retries from scratch.

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;

use tracing::debug;

use crate::error::RenderError;
use crate::geom::Affine;
use crate::painter::LocalPainter;
use crate::renderable::DisposeHandle;
use crate::scene::SceneObject;
use crate::surface::{DrawTarget, Raster};

/// Pixel dimensions of a local surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Round a logical size up to whole pixels. Negative sides become zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_logical(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0).ceil() as u32,
            height: height.max(0.0).ceil() as u32,
        }
    }

    /// Both sides zero: nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

/// What the cached surface must match to be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey {
    pub version: u64,
    pub hq: bool,
    pub size: SurfaceSize,
}

/// Observable cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Valid,
    Stale,
    Disposed,
}

/// Parameters for one [`LocalCache::refresh`].
#[derive(Debug, Clone, Copy)]
pub struct RefreshRequest {
    pub key: CacheKey,
    /// Transform installed on the surface while painting. `None` paints in
    /// plain local coordinates.
    pub transform: Option<Affine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Painted {
    version: u64,
    hq: bool,
}

/// Owns one renderable's local surface.
#[derive(Debug)]
pub struct LocalCache {
    surface: Option<Raster>,
    painted: Option<Painted>,
    allocations: u64,
    max_side: u32,
    disposed: bool,
}

impl LocalCache {
    #[must_use]
    pub fn new(max_side: u32) -> Self {
        Self {
            surface: None,
            painted: None,
            allocations: 0,
            max_side,
            disposed: false,
        }
    }

    /// True when the cached surface cannot be reused for `key`.
    #[must_use]
    pub fn needs_redraw(&self, key: &CacheKey) -> bool {
        match (&self.surface, self.painted) {
            (Some(surface), Some(painted)) => {
                painted.version != key.version
                    || painted.hq != key.hq
                    || surface.width() != key.size.width
                    || surface.height() != key.size.height
            }
            _ => true,
        }
    }

    #[must_use]
    pub fn state(&self, key: &CacheKey) -> CacheState {
        if self.disposed {
            CacheState::Disposed
        } else if self.surface.is_none() {
            CacheState::Empty
        } else if self.needs_redraw(key) {
            CacheState::Stale
        } else {
            CacheState::Valid
        }
    }

    /// The cached surface, whatever it was painted for.
    #[must_use]
    pub fn surface(&self) -> Option<&Raster> {
        self.surface.as_ref()
    }

    /// The cached surface if it was painted for `version`.
    #[must_use]
    pub fn valid_surface(&self, version: u64) -> Option<&Raster> {
        match self.painted {
            Some(painted) if painted.version == version => self.surface.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Number of surfaces allocated over the cache's lifetime.
    #[must_use]
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Repaint the local surface for `request`.
    ///
    /// # Errors
    ///
    /// - [`RenderError::Disposed`] if `disposed` is set before or after the
    ///   painter runs; any painted surface is discarded.
    /// - [`RenderError::Allocation`] if the size exceeds the side limit.
    /// - Whatever the painter returns.
    pub async fn refresh(
        &mut self,
        painter: &dyn LocalPainter,
        obj: &SceneObject,
        request: RefreshRequest,
        disposed: &DisposeHandle,
    ) -> Result<(), RenderError> {
        if disposed.is_disposed() {
            self.dispose();
            return Err(RenderError::Disposed { id: obj.id });
        }

        let mut surface = self.checkout(obj, request.key.size)?;
        surface.set_transform(request.transform.unwrap_or(Affine::IDENTITY));
        let painted = painter.paint(obj, &mut surface, request.key.hq).await;
        surface.set_transform(Affine::IDENTITY);

        if disposed.is_disposed() {
            debug!(id = %obj.id, "disposed during paint; discarding surface");
            self.dispose();
            return Err(RenderError::Disposed { id: obj.id });
        }

        match painted {
            Ok(()) => {
                self.surface = Some(surface);
                self.painted = Some(Painted {
                    version: request.key.version,
                    hq: request.key.hq,
                });
                Ok(())
            }
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    /// Drop the surface; the next render repaints.
    pub fn clear(&mut self) {
        self.surface = None;
        self.painted = None;
    }

    /// Drop the surface for good.
    pub fn dispose(&mut self) {
        self.clear();
        self.disposed = true;
    }

    /// Take the surface out for painting, reusing it when the size matches.
    fn checkout(&mut self, obj: &SceneObject, size: SurfaceSize) -> Result<Raster, RenderError> {
        self.painted = None;
        match self.surface.take() {
            Some(mut surface) if surface.width() == size.width && surface.height() == size.height => {
                surface.clear();
                Ok(surface)
            }
            _ => {
                let surface = Raster::allocate(size.width, size.height, self.max_side)?;
                self.allocations += 1;
                debug!(id = %obj.id, width = size.width, height = size.height, "allocated local surface");
                Ok(surface)
            }
        }
    }
}
