//! Resolve which text box, if any, is currently voicing an object.

#[cfg(test)]
#[path = "talk_test.rs"]
mod talk_test;

use crate::scene::{ObjectId, Panel};

/// First text box in draw order whose speaker is `id`.
///
/// Ids in the order lists without a matching object are skipped. The result
/// is recomputed on every prepare and never cached.
#[must_use]
pub fn resolve_talking(panel: &Panel, id: &ObjectId) -> Option<ObjectId> {
    panel
        .draw_order()
        .filter_map(|candidate| panel.get(candidate))
        .find(|obj| obj.is_talking_box_for(id))
        .map(|obj| obj.id)
}
