//! Drawing surfaces: the draw-primitive seam and the offscreen raster.
//!
//! [`DrawTarget`] is the only drawing interface painters and renderables see.
//! It has two implementations here:
//!
//! - [`Raster`]: a `tiny_skia` pixmap used as each object's local surface
//!   (and as a destination in tests and the probe CLI). Drawing is aliased
//!   and image sampling is nearest-neighbour, so pixel reads match what a
//!   hit test expects. Blur shadows are not rasterized.
//! - [`RecordingTarget`]: keeps the ordered list of draw calls without
//!   producing pixels, for inspecting what a frame would draw.
//!
//! A raster that has had restricted content drawn into it refuses pixel
//! reads with [`SampleError::Restricted`], mirroring cross-origin taint.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use serde::{Deserialize, Serialize};
use tiny_skia::{
    BlendMode, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8,
    Rect as SkiaRect, Stroke, Transform,
};

use crate::error::{RenderError, SampleError};
use crate::geom::{Affine, Point};
use crate::scene::{CompositeMode, SpriteFilter};

// =============================================================
// Paint values
// =============================================================

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const PURPLE: Self = Self::rgb(128, 0, 128);
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);
    pub const CYAN: Self = Self::rgb(0, 255, 255);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

/// Drop shadow attached to an image draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Color,
    pub blur: f64,
}

/// Stroke settings for rect outlines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outline {
    pub color: Color,
    pub width: f64,
}

/// Parameters for [`DrawTarget::draw_image`].
#[derive(Debug, Clone, Copy)]
pub struct ImageDraw<'a> {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    /// Clockwise radians applied about `rotation_anchor`.
    pub rotation: f64,
    pub rotation_anchor: Option<Point>,
    pub flip: bool,
    pub shadow: Option<Shadow>,
    pub composite: CompositeMode,
    pub filters: &'a [SpriteFilter],
    pub opacity: f64,
}

impl ImageDraw<'static> {
    /// Plain source-over draw of an image at `(x, y)` with size `(w, h)`.
    #[must_use]
    pub fn at(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            x,
            y,
            w,
            h,
            rotation: 0.0,
            rotation_anchor: None,
            flip: false,
            shadow: None,
            composite: CompositeMode::SourceOver,
            filters: &[],
            opacity: 1.0,
        }
    }
}

/// Parameters for [`DrawTarget::draw_rect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectDraw {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub fill: Option<Color>,
    pub outline: Option<Outline>,
    /// Clockwise radians applied about `rotation_anchor`.
    pub rotation: f64,
    pub rotation_anchor: Option<Point>,
}

impl RectDraw {
    /// An unrotated filled rectangle.
    #[must_use]
    pub fn filled(x: f64, y: f64, w: f64, h: f64, color: Color) -> Self {
        Self { x, y, w, h, fill: Some(color), outline: None, rotation: 0.0, rotation_anchor: None }
    }
}

/// Parameters for [`DrawTarget::draw_path`]: a closed polygon filled with
/// the even-odd rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDraw {
    pub points: Vec<Point>,
    pub fill: Color,
}

// =============================================================
// DrawTarget
// =============================================================

/// The draw-primitive layer every painter renders through.
pub trait DrawTarget: Send {
    /// The transform currently applied to all draw calls.
    fn transform(&self) -> Affine;

    /// Replace the current transform.
    fn set_transform(&mut self, transform: Affine);

    /// Draw `image` scaled into the rect described by `params`.
    ///
    /// # Errors
    ///
    /// Implementations return [`RenderError`] when the call cannot be honored.
    fn draw_image(&mut self, image: &Raster, params: &ImageDraw<'_>) -> Result<(), RenderError>;

    /// Fill and/or outline a rectangle.
    ///
    /// # Errors
    ///
    /// Implementations return [`RenderError`] when the call cannot be honored.
    fn draw_rect(&mut self, rect: &RectDraw) -> Result<(), RenderError>;

    /// Fill a closed polygon.
    ///
    /// # Errors
    ///
    /// Implementations return [`RenderError`] when the call cannot be honored.
    fn draw_path(&mut self, path: &PathDraw) -> Result<(), RenderError>;
}

/// Run `f` with `transform` appended to the target's current transform. The
/// previous transform is restored whether `f` succeeds or fails.
///
/// # Errors
///
/// Returns whatever `f` returns.
pub fn scoped<T, R, F>(target: &mut T, transform: &Affine, f: F) -> Result<R, RenderError>
where
    T: DrawTarget + ?Sized,
    F: FnOnce(&mut T) -> Result<R, RenderError>,
{
    let saved = target.transform();
    target.set_transform(saved.multiply(transform));
    let result = f(target);
    target.set_transform(saved);
    result
}

// =============================================================
// Raster
// =============================================================

/// An owned, pixel-queryable RGBA surface backed by a [`Pixmap`].
///
/// Zero-area rasters carry no pixmap; every draw into them is a no-op and
/// every read is transparent.
#[derive(Debug, Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    pixmap: Option<Pixmap>,
    transform: Affine,
    restricted: bool,
}

impl Raster {
    /// A transparent surface with no side limit.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Allocation`] when the pixel buffer cannot be
    /// created.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        Self::allocate(width, height, u32::MAX)
    }

    /// Allocate a transparent surface, refusing sides larger than `max_side`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Allocation`] when either side exceeds
    /// `max_side` or the pixel buffer cannot be created.
    pub fn allocate(width: u32, height: u32, max_side: u32) -> Result<Self, RenderError> {
        let refused = RenderError::Allocation { width, height, limit: max_side };
        if width > max_side || height > max_side {
            return Err(refused);
        }
        if width == 0 || height == 0 {
            return Ok(Self { width, height, ..Self::empty() });
        }
        let pixmap = Pixmap::new(width, height).ok_or(refused)?;
        Ok(Self { width, height, pixmap: Some(pixmap), ..Self::empty() })
    }

    /// A zero-area surface. Draws into it are no-ops and reads are
    /// transparent.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            pixmap: None,
            transform: Affine::IDENTITY,
            restricted: false,
        }
    }

    /// A surface filled with a single color.
    ///
    /// # Errors
    ///
    /// Same as [`Raster::new`].
    pub fn filled(width: u32, height: u32, color: Color) -> Result<Self, RenderError> {
        let mut raster = Self::new(width, height)?;
        if let Some(pixmap) = raster.pixmap.as_mut() {
            pixmap.fill(color.to_skia());
        }
        Ok(raster)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reset to fully transparent with an identity transform. Restriction
    /// survives clearing.
    pub fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
        self.transform = Affine::IDENTITY;
    }

    /// Mark the surface as holding restricted content.
    pub fn restrict(&mut self) {
        self.restricted = true;
    }

    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Straight-alpha color of the pixel at `(x, y)`, bypassing restriction.
    /// Intended for tests and tooling.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let Some(px) = self.pixmap.as_ref().and_then(|p| p.pixel(x, y)) else {
            return Some(Color::TRANSPARENT);
        };
        let a = px.alpha();
        if a == 0 {
            return Some(Color::TRANSPARENT);
        }
        let unmul = |c: u8| -> u8 { unit_to_byte(f64::from(c) / f64::from(a)) };
        Some(Color::rgba(unmul(px.red()), unmul(px.green()), unmul(px.blue()), a))
    }

    /// Alpha at integer pixel `(x, y)`. Coordinates outside the surface read
    /// as transparent.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::Restricted`] when the surface is restricted.
    pub fn sample_alpha(&self, x: i64, y: i64) -> Result<u8, SampleError> {
        if self.restricted {
            return Err(SampleError::Restricted);
        }
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return Ok(0);
        };
        Ok(self.pixmap.as_ref().and_then(|p| p.pixel(x, y)).map_or(0, |px| px.alpha()))
    }

    /// Infallible form of [`DrawTarget::draw_rect`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn fill_rect(&mut self, rect: &RectDraw) {
        let m = with_rotation(self.transform, rect.rotation, rect.rotation_anchor);
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let Some(bounds) = SkiaRect::from_xywh(rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32) else {
            return;
        };
        let transform = to_skia(&m);
        if let Some(fill) = rect.fill {
            pixmap.fill_rect(bounds, &solid(fill), transform, None);
        }
        if let Some(outline) = rect.outline {
            let stroke = Stroke { width: outline.width as f32, ..Stroke::default() };
            let path = PathBuilder::from_rect(bounds);
            pixmap.stroke_path(&path, &solid(outline.color), &stroke, transform, None);
        }
    }
}

impl DrawTarget for Raster {
    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn draw_image(&mut self, image: &Raster, params: &ImageDraw<'_>) -> Result<(), RenderError> {
        if image.restricted {
            self.restricted = true;
        }
        if params.w == 0.0 || params.h == 0.0 {
            return Ok(());
        }
        let (Some(src), Some(dst)) = (image.pixmap.as_ref(), self.pixmap.as_mut()) else {
            return Ok(());
        };

        let mut m = with_rotation(self.transform, params.rotation, params.rotation_anchor).translate(params.x, params.y);
        if params.flip {
            m = m.translate(params.w, 0.0).flip_x();
        }
        m = m.scale(params.w / f64::from(image.width), params.h / f64::from(image.height));

        let paint = PixmapPaint {
            opacity: params.opacity.clamp(0.0, 1.0) as f32,
            blend_mode: blend_mode(params.composite),
            quality: FilterQuality::Nearest,
        };
        if params.filters.is_empty() {
            dst.draw_pixmap(0, 0, src.as_ref(), &paint, to_skia(&m), None);
        } else {
            let filtered = apply_filters(src, params.filters);
            dst.draw_pixmap(0, 0, filtered.as_ref(), &paint, to_skia(&m), None);
        }
        Ok(())
    }

    fn draw_rect(&mut self, rect: &RectDraw) -> Result<(), RenderError> {
        self.fill_rect(rect);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn draw_path(&mut self, path: &PathDraw) -> Result<(), RenderError> {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return Ok(());
        };
        let Some((first, rest)) = path.points.split_first() else {
            return Ok(());
        };
        if rest.len() < 2 {
            return Ok(());
        }
        let mut builder = PathBuilder::new();
        builder.move_to(first.x as f32, first.y as f32);
        for p in rest {
            builder.line_to(p.x as f32, p.y as f32);
        }
        builder.close();
        if let Some(shape) = builder.finish() {
            pixmap.fill_path(&shape, &solid(path.fill), FillRule::EvenOdd, to_skia(&self.transform), None);
        }
        Ok(())
    }
}

// =============================================================
// Pixel math
// =============================================================

#[allow(clippy::cast_possible_truncation)]
fn to_skia(m: &Affine) -> Transform {
    Transform::from_row(m.a as f32, m.b as f32, m.c as f32, m.d as f32, m.e as f32, m.f as f32)
}

fn with_rotation(m: Affine, rotation: f64, anchor: Option<Point>) -> Affine {
    match anchor {
        Some(anchor) => m.rotate_about(anchor, rotation),
        None if rotation != 0.0 => m.rotate_rad(rotation),
        None => m,
    }
}

/// Aliased solid paint: edges land on pixel centers so hit tests see the
/// same coverage the eye does.
fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = false;
    paint
}

fn blend_mode(mode: CompositeMode) -> BlendMode {
    match mode {
        CompositeMode::SourceOver => BlendMode::SourceOver,
        CompositeMode::SourceAtop => BlendMode::SourceAtop,
        CompositeMode::DestinationOver => BlendMode::DestinationOver,
        CompositeMode::Lighter => BlendMode::Plus,
        CompositeMode::Multiply => BlendMode::Multiply,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_byte(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Copy of `image` with `filters` applied to every premultiplied pixel.
fn apply_filters(image: &Pixmap, filters: &[SpriteFilter]) -> Pixmap {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        *px = filter_pixel(*px, filters);
    }
    out
}

fn filter_pixel(px: PremultipliedColorU8, filters: &[SpriteFilter]) -> PremultipliedColorU8 {
    if px.alpha() == 0 {
        return px;
    }
    let mut a = f64::from(px.alpha()) / 255.0;
    let unmul = |c: u8| f64::from(c) / 255.0 / a;
    let mut rgb = [unmul(px.red()), unmul(px.green()), unmul(px.blue())];
    for filter in filters {
        match *filter {
            SpriteFilter::Opacity { value } => a *= value.clamp(0.0, 1.0),
            SpriteFilter::Brightness { value } => {
                for c in &mut rgb {
                    *c = (*c * value).clamp(0.0, 1.0);
                }
            }
            SpriteFilter::Grayscale { value } => {
                let lum = 0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2];
                for c in &mut rgb {
                    *c += (lum - *c) * value.clamp(0.0, 1.0);
                }
            }
            SpriteFilter::Invert { value } => {
                for c in &mut rgb {
                    *c += (1.0 - 2.0 * *c) * value.clamp(0.0, 1.0);
                }
            }
        }
    }
    let premul = |c: f64| unit_to_byte(c.clamp(0.0, 1.0) * a);
    PremultipliedColorU8::from_rgba(premul(rgb[0]), premul(rgb[1]), premul(rgb[2]), unit_to_byte(a))
        .unwrap_or(PremultipliedColorU8::TRANSPARENT)
}

// =============================================================
// RecordingTarget
// =============================================================

/// An owned copy of a `draw_image` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCall {
    pub transform: Affine,
    pub image_width: u32,
    pub image_height: u32,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub rotation: f64,
    pub rotation_anchor: Option<Point>,
    pub flip: bool,
    pub shadow: Option<Shadow>,
    pub composite: CompositeMode,
    pub filters: Vec<SpriteFilter>,
    pub opacity: f64,
}

/// One recorded draw call, with the transform active when it was issued.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Image(ImageCall),
    Rect { transform: Affine, rect: RectDraw },
    Path { transform: Affine, path: PathDraw },
}

/// A destination that records calls instead of rasterizing them.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    transform: Affine,
    calls: Vec<DrawCall>,
}

impl RecordingTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Take the recorded calls, leaving the target empty.
    pub fn drain(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }
}

impl DrawTarget for RecordingTarget {
    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn draw_image(&mut self, image: &Raster, params: &ImageDraw<'_>) -> Result<(), RenderError> {
        self.calls.push(DrawCall::Image(ImageCall {
            transform: self.transform,
            image_width: image.width(),
            image_height: image.height(),
            x: params.x,
            y: params.y,
            w: params.w,
            h: params.h,
            rotation: params.rotation,
            rotation_anchor: params.rotation_anchor,
            flip: params.flip,
            shadow: params.shadow,
            composite: params.composite,
            filters: params.filters.to_vec(),
            opacity: params.opacity,
        }));
        Ok(())
    }

    fn draw_rect(&mut self, rect: &RectDraw) -> Result<(), RenderError> {
        self.calls.push(DrawCall::Rect { transform: self.transform, rect: *rect });
        Ok(())
    }

    fn draw_path(&mut self, path: &PathDraw) -> Result<(), RenderError> {
        self.calls.push(DrawCall::Path { transform: self.transform, path: path.clone() });
        Ok(())
    }
}
