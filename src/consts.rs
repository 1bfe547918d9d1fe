//! Shared numeric constants for the renderer.

// ── Placement ───────────────────────────────────────────────────

/// Uniform scale applied to an object while a text box shows its line.
pub const TALK_ENLARGE_SCALE: f64 = 1.05;

/// Default logical screen width (full-canvas local surfaces).
pub const DEFAULT_SCREEN_WIDTH: u32 = 1280;

/// Default logical screen height (full-canvas local surfaces).
pub const DEFAULT_SCREEN_HEIGHT: u32 = 720;

// ── Surfaces ────────────────────────────────────────────────────

/// Largest side, in pixels, a local surface may be allocated with.
pub const DEFAULT_MAX_SURFACE_SIDE: u32 = 16_384;

// ── Selection highlight ─────────────────────────────────────────

/// Blur radius of the selection shadow.
pub const SELECTION_SHADOW_BLUR: f64 = 20.0;

// ── Debug overlay ───────────────────────────────────────────────

/// Outline width of painted hitboxes.
pub const DEBUG_HITBOX_OUTLINE: f64 = 2.0;

/// Side of the anchor and last-hit markers.
pub const DEBUG_MARKER_SIZE: f64 = 5.0;
