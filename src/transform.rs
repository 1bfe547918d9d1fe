//! Placement transform for a scene object.
//!
//! The composition order is fixed:
//!
//! 1. translate to the top-left corner `(x - w/2, y)`
//! 2. talk enlarge (scale 1.05) when talking and enabled
//! 3. around the center: flip, rotate (clockwise degrees), zoom
//! 4. surface-to-logical scale when the local surface has a different size

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use crate::consts::TALK_ENLARGE_SCALE;
use crate::geom::{Affine, Size};
use crate::scene::SceneObject;

/// Compute the placement of `obj`.
///
/// `local_size` is the logical size of the object's local surface; pass
/// `None` when it equals the object's declared size.
#[must_use]
pub fn compute_transform(obj: &SceneObject, is_talking: bool, local_size: Option<Size>) -> Affine {
    let mut m = Affine::IDENTITY.translate(obj.x - obj.width / 2.0, obj.y);

    if is_talking && obj.enlarge_when_talking {
        m = m.scale(TALK_ENLARGE_SCALE, TALK_ENLARGE_SCALE);
    }

    m = m.translate(obj.width / 2.0, obj.height / 2.0);
    if obj.flip {
        m = m.flip_x();
    }
    if obj.rotation != 0.0 {
        m = m.rotate_deg(obj.rotation);
    }
    if obj.zoom != 1.0 {
        m = m.scale(obj.zoom, obj.zoom);
    }
    m = m.translate(-obj.width / 2.0, -obj.height / 2.0);

    if let Some(local) = local_size {
        if local.width != obj.width || local.height != obj.height {
            m = m.scale(obj.width / local.width, obj.height / local.height);
        }
    }
    m
}
