//! Selection and focus state, and the highlight it maps to.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::consts::SELECTION_SHADOW_BLUR;
use crate::scene::ObjectId;
use crate::surface::{Color, Shadow};

/// Per-object selection bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectedState {
    #[default]
    None = 0b00,
    Selected = 0b01,
    Focused = 0b10,
    Both = 0b11,
}

impl SelectedState {
    /// Build from the two flag bits; higher bits are ignored.
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b01 => Self::Selected,
            0b10 => Self::Focused,
            0b11 => Self::Both,
            _ => Self::None,
        }
    }

    #[must_use]
    pub fn from_flags(selected: bool, focused: bool) -> Self {
        Self::from_bits(u8::from(selected) | (u8::from(focused) << 1))
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// The shadow drawn behind a highlighted object.
    #[must_use]
    pub fn highlight(self) -> Option<Shadow> {
        let color = match self {
            Self::None => return None,
            Self::Selected => Color::RED,
            Self::Focused => Color::BLUE,
            Self::Both => Color::PURPLE,
        };
        Some(Shadow { color, blur: SELECTION_SHADOW_BLUR })
    }
}

/// Which objects are selected and which one holds focus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub selected: HashSet<ObjectId>,
    #[serde(default)]
    pub focused: Option<ObjectId>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, id: ObjectId) {
        self.selected.insert(id);
    }

    pub fn focus(&mut self, id: Option<ObjectId>) {
        self.focused = id;
    }

    #[must_use]
    pub fn state_of(&self, id: &ObjectId) -> SelectedState {
        SelectedState::from_flags(self.selected.contains(id), self.focused.as_ref() == Some(id))
    }
}
