//! Scene snapshot: the read-only view of objects and panel ordering that the
//! renderer consumes.
//!
//! The mutable store and its mutation log live outside this crate. Every
//! mutation there bumps `version`, which is the only dirty signal the cache
//! relies on. Snapshots arrive as JSON in the probe CLI and in tests.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a scene object.
pub type ObjectId = Uuid;

/// The category of a scene object. Determines which painter and which
/// renderer variant handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Full-screen backdrop.
    Background,
    /// Multi-part character sprite.
    Character,
    /// Single image sprite.
    Sprite,
    /// Dialogue box, optionally linked to the object that is speaking.
    TextBox,
    /// Choice menu.
    Choice,
    /// Notification popup.
    Notification,
    /// Poem page.
    Poem,
}

/// How an object's pixels combine with what is already on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeMode {
    #[default]
    SourceOver,
    SourceAtop,
    DestinationOver,
    Lighter,
    Multiply,
}

/// A per-object color filter applied when the cached surface is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SpriteFilter {
    /// Multiply alpha by `value` (0..=1).
    Opacity { value: f64 },
    /// Multiply color channels by `value`.
    Brightness { value: f64 },
    /// Blend toward luminance by `value` (0..=1).
    Grayscale { value: f64 },
    /// Blend toward the inverted color by `value` (0..=1).
    Invert { value: f64 },
}

fn one() -> f64 {
    1.0
}

/// Snapshot of a single scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Unique identifier for this object.
    pub id: ObjectId,
    /// Object category.
    pub kind: ObjectKind,
    /// Horizontal center of the object in scene coordinates.
    pub x: f64,
    /// Top edge of the object in scene coordinates.
    pub y: f64,
    /// Declared width.
    pub width: f64,
    /// Declared height.
    pub height: f64,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Mirror horizontally.
    #[serde(default)]
    pub flip: bool,
    /// Uniform zoom factor.
    #[serde(default = "one")]
    pub zoom: f64,
    /// Opacity in `0..=1`.
    #[serde(default = "one")]
    pub opacity: f64,
    /// Composite operation used when drawing onto the destination.
    #[serde(default)]
    pub composite: CompositeMode,
    /// Filters applied when drawing onto the destination.
    #[serde(default)]
    pub filters: Vec<SpriteFilter>,
    /// Bumped by every mutation in the external store.
    pub version: u64,
    /// Scale up slightly while a text box is showing this object's line.
    #[serde(default)]
    pub enlarge_when_talking: bool,
    /// Parent whose placement this object is positioned relative to.
    #[serde(default)]
    pub linked_to: Option<ObjectId>,
    /// For text boxes: the object currently speaking.
    #[serde(default)]
    pub talking_obj_id: Option<ObjectId>,
}

impl SceneObject {
    /// A fresh untransformed object with a random id and version 1.
    #[must_use]
    pub fn new(kind: ObjectKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            flip: false,
            zoom: 1.0,
            opacity: 1.0,
            composite: CompositeMode::SourceOver,
            filters: Vec::new(),
            version: 1,
            enlarge_when_talking: false,
            linked_to: None,
            talking_obj_id: None,
        }
    }

    /// Whether this is a text box pointing at `id` as its speaker.
    #[must_use]
    pub fn is_talking_box_for(&self, id: &ObjectId) -> bool {
        self.kind == ObjectKind::TextBox && self.talking_obj_id.as_ref() == Some(id)
    }
}

/// Objects of one panel with their two ordered id lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Panel {
    #[serde(default)]
    pub objects: HashMap<ObjectId, SceneObject>,
    /// Primary z-order, bottom first.
    #[serde(default)]
    pub order: Vec<ObjectId>,
    /// Overlay z-order, drawn above everything in `order`.
    #[serde(default)]
    pub on_top_order: Vec<ObjectId>,
}

impl Panel {
    /// Create an empty panel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object, appending it to the primary order if new.
    pub fn insert(&mut self, obj: SceneObject) {
        let id = obj.id;
        if self.objects.insert(id, obj).is_none() {
            self.order.push(id);
        }
    }

    /// Insert or replace an object, appending it to the overlay order if new.
    pub fn insert_on_top(&mut self, obj: SceneObject) {
        let id = obj.id;
        if self.objects.insert(id, obj).is_none() {
            self.on_top_order.push(id);
        }
    }

    /// Remove an object and its ordering entries.
    pub fn remove(&mut self, id: &ObjectId) -> Option<SceneObject> {
        self.order.retain(|o| o != id);
        self.on_top_order.retain(|o| o != id);
        self.objects.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    /// Mutable access for tests and tooling that simulate store mutations.
    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    /// Ids in draw order: primary order, then overlay order.
    pub fn draw_order(&self) -> impl DoubleEndedIterator<Item = &ObjectId> {
        self.order.iter().chain(self.on_top_order.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
