//! Cached object renderer with pixel-exact selection for 2D scene panels.
//!
//! Each scene object gets a [`renderable::Renderable`] that paints it once
//! into a private surface, reuses that surface until the object changes, and
//! answers hit tests against the surface's actual pixels. The
//! [`engine::SceneEngine`] drives all renderables of a panel through one
//! frame at a time.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Frame pipeline: sync, prepare, placement map, render, hit test |
//! | [`renderable`] | Per-object render unit and its variants |
//! | [`cache`] | Local surface ownership, reuse and redraw decisions |
//! | [`hit`] | Two-phase hit testing with sticky bounding-box fallback |
//! | [`transform`] | Placement transform in fixed composition order |
//! | [`talk`] | Text box to speaker resolution |
//! | [`selection`] | Selection bitmask and highlight shadows |
//! | [`painter`] | Local painter seam and registry |
//! | [`assets`] | Asset resolution with error placeholder |
//! | [`surface`] | Draw-primitive trait, software raster, recording target |
//! | [`scene`] | Read-only object and panel snapshot types |
//! | [`geom`] | Points, sizes and affine transforms |
//! | [`config`] | Environment configuration and per-pass settings |
//! | [`error`] | Error types |
//! | [`consts`] | Shared numeric constants |

pub mod assets;
pub mod cache;
pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod geom;
pub mod hit;
pub mod painter;
pub mod renderable;
pub mod scene;
pub mod selection;
pub mod surface;
pub mod talk;
pub mod transform;
