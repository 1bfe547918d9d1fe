//! Two-phase hit testing against a cached local surface.
//!
//! Phase 1 rejects points outside the object's bounds cheaply. Phase 2
//! samples the alpha channel of the cached surface at the matching pixel, so
//! transparent regions inside the bounds do not count as hits.
//!
//! Surfaces holding restricted content cannot be read back. The first such
//! failure switches the tester into a sticky fallback where a phase 1 hit is
//! final.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use tracing::warn;

use crate::error::SampleError;
use crate::geom::{Affine, Point, Size, rotate_around};
use crate::surface::Raster;

/// Axis-aligned bounds before rotation. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl Hitbox {
    /// Bounds of a `width × height` box whose top edge is centered on `(x, y)`.
    #[must_use]
    pub fn top_center(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x0: x - width / 2.0,
            x1: x + width / 2.0,
            y0: y,
            y1: y + height,
        }
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Where a surface of `surface_w × surface_h` pixels lands on the destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// How a destination point maps back onto the cached surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitGeometry {
    /// Surface drawn into `draw`, rotated by `angle` about `anchor`.
    Anchored {
        hitbox: Hitbox,
        angle: f64,
        anchor: Point,
        draw: DrawRect,
        flip: bool,
    },
    /// Surface placed by an affine transform. `inverse` maps destination
    /// points into local coordinates; `None` when the transform is singular.
    Mapped {
        inverse: Option<Affine>,
        local: Size,
        /// Sample the surface at the destination point itself (the surface
        /// already holds destination-space pixels).
        sample_at_point: bool,
    },
}

/// Per-renderable hit state.
#[derive(Debug, Default)]
pub struct HitTester {
    fallback: bool,
    last_hit: Option<Point>,
}

impl HitTester {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once pixel reads have failed for this renderable.
    #[must_use]
    pub fn in_fallback(&self) -> bool {
        self.fallback
    }

    /// The last surface-space point sampled in phase 2.
    #[must_use]
    pub fn last_hit(&self) -> Option<Point> {
        self.last_hit
    }

    /// Test `point` against `surface` placed by `geometry`. No surface is a
    /// miss.
    pub fn test(&mut self, geometry: &HitGeometry, point: Point, surface: Option<&Raster>) -> bool {
        let Some(surface) = surface else {
            return false;
        };
        if !in_bounds(geometry, point) {
            return false;
        }
        if self.fallback {
            return true;
        }
        let Some(sample) = sample_point(geometry, point, surface) else {
            return false;
        };

        self.last_hit = Some(sample);
        match read_alpha(surface, sample) {
            Ok(alpha) => alpha != 0,
            Err(SampleError::Restricted) => {
                warn!("pixel read restricted; falling back to bounding-box hit tests");
                self.fallback = true;
                true
            }
        }
    }
}

/// Phase 1.
fn in_bounds(geometry: &HitGeometry, point: Point) -> bool {
    match *geometry {
        HitGeometry::Anchored { hitbox, angle, anchor, .. } => hitbox.contains(rotate_around(point, anchor, -angle)),
        HitGeometry::Mapped { inverse, local, .. } => inverse.is_some_and(|inverse| {
            let p = inverse.transform_point(point);
            p.x >= 0.0 && p.y >= 0.0 && p.x <= local.width && p.y <= local.height
        }),
    }
}

/// Phase 2 mapping: the surface pixel under `point`, or `None` when the
/// point falls outside the drawn image.
fn sample_point(geometry: &HitGeometry, point: Point, surface: &Raster) -> Option<Point> {
    match *geometry {
        HitGeometry::Anchored { angle, anchor, draw, flip, .. } => {
            if draw.w <= 0.0 || draw.h <= 0.0 {
                return None;
            }
            let rotated = rotate_around(point, anchor, -angle);
            let inner_x = (rotated.x - draw.x).round();
            let inner_y = (rotated.y - draw.y).round();
            if inner_x < 0.0 || inner_x > draw.w || inner_y < 0.0 || inner_y > draw.h {
                return None;
            }
            let flipped_x = if flip { draw.w - inner_x } else { inner_x };
            let scale_x = f64::from(surface.width()) / draw.w;
            let scale_y = f64::from(surface.height()) / draw.h;
            Some(Point::new((flipped_x * scale_x).round(), (inner_y * scale_y).round()))
        }
        HitGeometry::Mapped { inverse, sample_at_point, .. } => {
            let local_point = inverse?.transform_point(point);
            let target = if sample_at_point { point } else { local_point };
            Some(Point::new(target.x.floor(), target.y.floor()))
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn read_alpha(surface: &Raster, p: Point) -> Result<u8, SampleError> {
    surface.sample_alpha(p.x as i64, p.y as i64)
}
