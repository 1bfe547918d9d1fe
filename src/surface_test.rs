#![allow(clippy::float_cmp)]

use super::*;

fn opaque_alpha(r: &Raster, x: i64, y: i64) -> u8 {
    r.sample_alpha(x, y).unwrap()
}

// =============================================================
// Raster basics
// =============================================================

#[test]
fn new_raster_is_transparent() {
    let r = Raster::new(4, 3).unwrap();
    assert_eq!(r.width(), 4);
    assert_eq!(r.height(), 3);
    assert_eq!(opaque_alpha(&r, 0, 0), 0);
    assert_eq!(r.pixel(3, 2), Some(Color::TRANSPARENT));
    assert_eq!(r.pixel(4, 0), None);
}

#[test]
fn zero_area_raster_is_allowed() {
    let r = Raster::new(0, 0).unwrap();
    assert_eq!(opaque_alpha(&r, 0, 0), 0);
}

#[test]
fn allocate_rejects_oversized_side() {
    let err = Raster::allocate(5000, 10, 4096).unwrap_err();
    assert_eq!(err, RenderError::Allocation { width: 5000, height: 10, limit: 4096 });
    assert!(Raster::allocate(4096, 4096, 4096).is_ok());
}

#[test]
fn unrepresentable_pixmap_is_an_allocation_error() {
    // Inside the side limit, but the row stride overflows the pixmap format.
    let err = Raster::allocate(u32::MAX / 2, 1, u32::MAX).unwrap_err();
    assert_eq!(err, RenderError::Allocation { width: u32::MAX / 2, height: 1, limit: u32::MAX });
    assert!(Raster::new(u32::MAX, 1).is_err());
}

#[test]
fn empty_raster_ignores_draws() {
    let mut r = Raster::empty();
    r.draw_rect(&RectDraw::filled(0.0, 0.0, 4.0, 4.0, Color::RED)).unwrap();
    let src = Raster::filled(1, 1, Color::RED).unwrap();
    r.draw_image(&src, &ImageDraw::at(0.0, 0.0, 1.0, 1.0)).unwrap();
    assert_eq!(r.pixel(0, 0), None);
    assert_eq!(opaque_alpha(&r, 0, 0), 0);
}

#[test]
fn sample_outside_bounds_reads_transparent() {
    let r = Raster::filled(2, 2, Color::RED).unwrap();
    assert_eq!(opaque_alpha(&r, -1, 0), 0);
    assert_eq!(opaque_alpha(&r, 2, 0), 0);
    assert_eq!(opaque_alpha(&r, 1, 1), 255);
}

#[test]
fn restricted_raster_refuses_reads() {
    let mut r = Raster::filled(2, 2, Color::RED).unwrap();
    r.restrict();
    assert_eq!(r.sample_alpha(0, 0), Err(SampleError::Restricted));
    r.clear();
    assert!(r.is_restricted());
}

#[test]
fn clear_resets_pixels_and_transform() {
    let mut r = Raster::filled(2, 2, Color::BLUE).unwrap();
    r.set_transform(Affine::IDENTITY.translate(5.0, 5.0));
    r.clear();
    assert_eq!(opaque_alpha(&r, 0, 0), 0);
    assert!(r.transform().is_identity());
}

// =============================================================
// draw_rect / draw_path
// =============================================================

#[test]
fn fill_rect_covers_pixel_centers() {
    let mut r = Raster::new(10, 10).unwrap();
    r.draw_rect(&RectDraw::filled(2.0, 2.0, 3.0, 3.0, Color::RED)).unwrap();
    assert_eq!(r.pixel(2, 2), Some(Color::RED));
    assert_eq!(r.pixel(4, 4), Some(Color::RED));
    assert_eq!(r.pixel(5, 5), Some(Color::TRANSPARENT));
    assert_eq!(r.pixel(1, 2), Some(Color::TRANSPARENT));
}

#[test]
fn fill_rect_respects_transform() {
    let mut r = Raster::new(10, 10).unwrap();
    r.set_transform(Affine::IDENTITY.translate(5.0, 0.0));
    r.draw_rect(&RectDraw::filled(0.0, 0.0, 2.0, 2.0, Color::BLUE)).unwrap();
    assert_eq!(r.pixel(5, 0), Some(Color::BLUE));
    assert_eq!(r.pixel(0, 0), Some(Color::TRANSPARENT));
}

#[test]
fn outline_leaves_interior_empty() {
    let mut r = Raster::new(20, 20).unwrap();
    let rect = RectDraw {
        outline: Some(Outline { color: Color::BLACK, width: 2.0 }),
        fill: None,
        ..RectDraw::filled(4.0, 4.0, 10.0, 10.0, Color::BLACK)
    };
    r.draw_rect(&rect).unwrap();
    assert_eq!(r.pixel(4, 8).map(|c| c.a), Some(255));
    assert_eq!(r.pixel(9, 9), Some(Color::TRANSPARENT));
}

#[test]
fn path_fills_triangle() {
    let mut r = Raster::new(10, 10).unwrap();
    let path = PathDraw {
        points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 10.0)],
        fill: Color::RED,
    };
    r.draw_path(&path).unwrap();
    assert_eq!(r.pixel(1, 1), Some(Color::RED));
    assert_eq!(r.pixel(9, 9), Some(Color::TRANSPARENT));
}

// =============================================================
// draw_image
// =============================================================

#[test]
fn draw_image_scales_to_target_rect() {
    let src = Raster::filled(2, 2, Color::RED).unwrap();
    let mut dst = Raster::new(10, 10).unwrap();
    dst.draw_image(&src, &ImageDraw::at(1.0, 1.0, 4.0, 4.0)).unwrap();
    assert_eq!(dst.pixel(1, 1), Some(Color::RED));
    assert_eq!(dst.pixel(4, 4), Some(Color::RED));
    assert_eq!(dst.pixel(5, 5), Some(Color::TRANSPARENT));
}

#[test]
fn draw_image_flip_mirrors_pixels() {
    let mut src = Raster::new(2, 1).unwrap();
    src.draw_rect(&RectDraw::filled(0.0, 0.0, 1.0, 1.0, Color::RED)).unwrap();
    let mut dst = Raster::new(2, 1).unwrap();
    let params = ImageDraw { flip: true, ..ImageDraw::at(0.0, 0.0, 2.0, 1.0) };
    dst.draw_image(&src, &params).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(Color::TRANSPARENT));
    assert_eq!(dst.pixel(1, 0), Some(Color::RED));
}

#[test]
fn draw_image_rotates_about_anchor() {
    // A 4x2 bar rotated a quarter turn about its center becomes 2x4.
    let src = Raster::filled(4, 2, Color::BLUE).unwrap();
    let mut dst = Raster::new(10, 10).unwrap();
    let params = ImageDraw {
        rotation: std::f64::consts::FRAC_PI_2,
        rotation_anchor: Some(Point::new(5.0, 5.0)),
        ..ImageDraw::at(3.0, 4.0, 4.0, 2.0)
    };
    dst.draw_image(&src, &params).unwrap();
    assert_eq!(dst.pixel(4, 3), Some(Color::BLUE));
    assert_eq!(dst.pixel(5, 6), Some(Color::BLUE));
    assert_eq!(dst.pixel(3, 4), Some(Color::TRANSPARENT));
}

#[test]
fn draw_image_applies_opacity() {
    let src = Raster::filled(1, 1, Color::WHITE).unwrap();
    let mut dst = Raster::new(1, 1).unwrap();
    let params = ImageDraw { opacity: 0.5, ..ImageDraw::at(0.0, 0.0, 1.0, 1.0) };
    dst.draw_image(&src, &params).unwrap();
    let alpha = dst.pixel(0, 0).map_or(0, |c| c.a);
    assert!((127..=128).contains(&alpha));
}

#[test]
fn draw_image_applies_filters() {
    let src = Raster::filled(1, 1, Color::WHITE).unwrap();
    let mut dst = Raster::new(1, 1).unwrap();
    let filters = [SpriteFilter::Invert { value: 1.0 }];
    let params = ImageDraw { filters: &filters, ..ImageDraw::at(0.0, 0.0, 1.0, 1.0) };
    dst.draw_image(&src, &params).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(Color::BLACK));
}

#[test]
fn source_atop_only_paints_over_existing_pixels() {
    let mut dst = Raster::new(2, 1).unwrap();
    dst.draw_rect(&RectDraw::filled(0.0, 0.0, 1.0, 1.0, Color::BLUE)).unwrap();
    let src = Raster::filled(2, 1, Color::RED).unwrap();
    let params = ImageDraw { composite: CompositeMode::SourceAtop, ..ImageDraw::at(0.0, 0.0, 2.0, 1.0) };
    dst.draw_image(&src, &params).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(Color::RED));
    assert_eq!(dst.pixel(1, 0), Some(Color::TRANSPARENT));
}

#[test]
fn destination_over_keeps_existing_pixels_on_top() {
    let mut dst = Raster::filled(1, 1, Color::BLUE).unwrap();
    let src = Raster::filled(1, 1, Color::RED).unwrap();
    let params = ImageDraw { composite: CompositeMode::DestinationOver, ..ImageDraw::at(0.0, 0.0, 1.0, 1.0) };
    dst.draw_image(&src, &params).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(Color::BLUE));
}

#[test]
fn drawing_restricted_image_taints_destination() {
    let mut src = Raster::filled(1, 1, Color::RED).unwrap();
    src.restrict();
    let mut dst = Raster::new(1, 1).unwrap();
    dst.draw_image(&src, &ImageDraw::at(0.0, 0.0, 1.0, 1.0)).unwrap();
    assert!(dst.is_restricted());
    assert_eq!(dst.sample_alpha(0, 0), Err(SampleError::Restricted));
}

// =============================================================
// scoped / RecordingTarget
// =============================================================

#[test]
fn scoped_restores_transform_on_success() {
    let mut t = RecordingTarget::new();
    let m = Affine::IDENTITY.translate(3.0, 4.0);
    scoped(&mut t, &m, |t| {
        assert_eq!(t.transform(), m);
        t.draw_rect(&RectDraw::filled(0.0, 0.0, 1.0, 1.0, Color::RED))
    })
    .unwrap();
    assert!(t.transform().is_identity());
    assert!(matches!(&t.calls()[0], DrawCall::Rect { transform, .. } if *transform == m));
}

#[test]
fn scoped_restores_transform_on_error() {
    let mut t = RecordingTarget::new();
    let result: Result<(), RenderError> =
        scoped(&mut t, &Affine::IDENTITY.scale(2.0, 2.0), |_| Err(RenderError::Paint("boom".into())));
    assert!(result.is_err());
    assert!(t.transform().is_identity());
}

#[test]
fn recording_target_keeps_call_order() {
    let mut t = RecordingTarget::new();
    let img = Raster::new(3, 2).unwrap();
    t.draw_rect(&RectDraw::filled(0.0, 0.0, 1.0, 1.0, Color::RED)).unwrap();
    t.draw_image(&img, &ImageDraw::at(1.0, 2.0, 3.0, 4.0)).unwrap();
    let calls = t.drain();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0], DrawCall::Rect { .. }));
    match &calls[1] {
        DrawCall::Image(call) => {
            assert_eq!((call.image_width, call.image_height), (3, 2));
            assert_eq!(call.w, 3.0);
        }
        other => panic!("expected image call, got {other:?}"),
    }
    assert!(t.calls().is_empty());
}
