//! Error types shared by the renderer, cache and hit tester.
//!
//! ERROR HANDLING
//! ==============
//! `RenderError` is per-object: the engine logs it, resets that object's
//! cache and keeps drawing siblings. `Disposed` is a programming error and is
//! returned immediately instead of being treated as a no-op. `SampleError`
//! never leaves the hit tester; it flips the renderable into bounding-box
//! mode.

use crate::scene::ObjectId;

/// Failure while preparing, painting or placing a single object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// The renderable was used after `dispose`.
    #[error("renderable {id} used after dispose")]
    Disposed { id: ObjectId },
    /// An offscreen surface could not be allocated.
    #[error("cannot allocate {width}x{height} surface (max side {limit})")]
    Allocation { width: u32, height: u32, limit: u32 },
    /// The local painter reported a failure.
    #[error("local paint failed: {0}")]
    Paint(String),
}

/// Failure reading pixel data back from a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    /// The surface holds restricted (cross-origin) content.
    #[error("pixel reads are restricted on this surface")]
    Restricted,
}
