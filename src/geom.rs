//! Geometry primitives: points, sizes and 2D affine matrices.
//!
//! [`Affine`] follows DOM-matrix conventions: every builder method
//! post-multiplies, so `m.translate(..).rotate_deg(..)` applies the rotation
//! first when transforming a point. Positive angles rotate clockwise in the
//! y-down canvas coordinate system.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

/// A point in scene, local, or surface space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A logical width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Rotate `point` around `anchor` by `angle` radians (clockwise on screen).
#[must_use]
pub fn rotate_around(point: Point, anchor: Point, angle: f64) -> Point {
    let (sin, cos) = angle.sin_cos();
    let dx = point.x - anchor.x;
    let dy = point.y - anchor.y;
    Point {
        x: anchor.x + dx * cos - dy * sin,
        y: anchor.y + dx * sin + dy * cos,
    }
}

/// A 2D affine transform `[a c e; b d f; 0 0 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Self = Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    /// A pure translation.
    #[must_use]
    pub fn from_translation(tx: f64, ty: f64) -> Self {
        Self { e: tx, f: ty, ..Self::IDENTITY }
    }

    /// `self * other`: `other` is applied to points first.
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    #[must_use]
    pub fn translate(&self, tx: f64, ty: f64) -> Self {
        self.multiply(&Self::from_translation(tx, ty))
    }

    #[must_use]
    pub fn scale(&self, sx: f64, sy: f64) -> Self {
        self.multiply(&Self { a: sx, d: sy, ..Self::IDENTITY })
    }

    /// Mirror along the local y axis.
    #[must_use]
    pub fn flip_x(&self) -> Self {
        self.scale(-1.0, 1.0)
    }

    #[must_use]
    pub fn rotate_deg(&self, degrees: f64) -> Self {
        self.rotate_rad(degrees.to_radians())
    }

    #[must_use]
    pub fn rotate_rad(&self, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        self.multiply(&Self { a: cos, b: sin, c: -sin, d: cos, e: 0.0, f: 0.0 })
    }

    /// Rotate by `radians` about `anchor` (expressed in the current space).
    #[must_use]
    pub fn rotate_about(&self, anchor: Point, radians: f64) -> Self {
        self.translate(anchor.x, anchor.y)
            .rotate_rad(radians)
            .translate(-anchor.x, -anchor.y)
    }

    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// The inverse transform, or `None` when the matrix is singular.
    #[must_use]
    pub fn invert(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    #[must_use]
    pub fn transform_point(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Component-wise comparison within `eps`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        (self.a - other.a).abs() <= eps
            && (self.b - other.b).abs() <= eps
            && (self.c - other.c).abs() <= eps
            && (self.d - other.d).abs() <= eps
            && (self.e - other.e).abs() <= eps
            && (self.f - other.f).abs() <= eps
    }
}
