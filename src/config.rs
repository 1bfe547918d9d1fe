//! Engine configuration and per-pass render settings.
//!
//! `EngineConfig` is read once from the environment; every key has a default
//! and unparseable values fall back to it. `RenderPass` is built per frame
//! so export and preview passes can differ without shared state.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MAX_SURFACE_SIDE, DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH};
use crate::selection::SelectedState;

// =============================================================
// DebugHitboxes
// =============================================================

/// Which objects get their hitbox painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugHitboxes {
    #[default]
    None,
    Selected,
    All,
}

impl DebugHitboxes {
    /// Whether an object in `state` gets the overlay.
    #[must_use]
    pub fn shows(self, state: SelectedState) -> bool {
        match self {
            Self::None => false,
            Self::Selected => !state.is_none(),
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown debug hitbox mode {0:?} (expected none, selected or all)")]
pub struct ParseDebugHitboxesError(String);

impl FromStr for DebugHitboxes {
    type Err = ParseDebugHitboxesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "selected" => Ok(Self::Selected),
            "all" => Ok(Self::All),
            other => Err(ParseDebugHitboxesError(other.to_owned())),
        }
    }
}

impl fmt::Display for DebugHitboxes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Selected => "selected",
            Self::All => "all",
        })
    }
}

// =============================================================
// RenderPass
// =============================================================

/// Settings for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPass {
    /// Use high-quality assets.
    pub hq: bool,
    /// Editor preview: selection shadows are drawn.
    pub interactive: bool,
    /// Allow painting straight onto the destination when the cache is cold.
    pub skip_local: bool,
    pub debug_hitboxes: DebugHitboxes,
}

impl RenderPass {
    /// Interactive editor frame.
    #[must_use]
    pub fn preview(debug_hitboxes: DebugHitboxes) -> Self {
        Self { hq: false, interactive: true, skip_local: false, debug_hitboxes }
    }

    /// Final-quality frame without selection or debug output.
    #[must_use]
    pub fn export() -> Self {
        Self { hq: true, interactive: false, skip_local: false, debug_hitboxes: DebugHitboxes::None }
    }
}

// =============================================================
// EngineConfig
// =============================================================

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Logical screen width, used for full-canvas local surfaces.
    pub screen_width: u32,
    /// Logical screen height, used for full-canvas local surfaces.
    pub screen_height: u32,
    /// Largest side a local surface may be allocated with.
    pub max_surface_side: u32,
    /// Default for preview passes.
    pub debug_hitboxes: DebugHitboxes,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
            max_surface_side: DEFAULT_MAX_SURFACE_SIDE,
            debug_hitboxes: DebugHitboxes::None,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            screen_width: env_parse("TABLEAU_SCREEN_WIDTH", DEFAULT_SCREEN_WIDTH),
            screen_height: env_parse("TABLEAU_SCREEN_HEIGHT", DEFAULT_SCREEN_HEIGHT),
            max_surface_side: env_parse("TABLEAU_MAX_SURFACE_SIDE", DEFAULT_MAX_SURFACE_SIDE),
            debug_hitboxes: env_parse("TABLEAU_DEBUG_HITBOXES", DebugHitboxes::None),
        }
    }

    /// A preview pass using the configured debug mode.
    #[must_use]
    pub fn preview_pass(&self) -> RenderPass {
        RenderPass::preview(self.debug_hitboxes)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    std::env::var(key).map_or(default, |v| v.parse::<T>().unwrap_or(default))
}
