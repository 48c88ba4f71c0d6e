//! Placement rewrites applied to items on their way into the valid set.

use crate::model::item::{BULK_STORAGE_SLOT, DURABILITY_ATTRIBUTES, Item};

/// Move an item out of a fixed equipment slot into bulk storage.
///
/// When `item.slot` is an anchor slot it becomes [`BULK_STORAGE_SLOT`] and
/// the placement is cleared. Returns `true` if the item was rewritten.
///
/// Occupancy of the destination is not tracked; two items may end up with
/// the same derived location and it is up to the consumer to lay them out.
pub fn normalize(item: &mut Item) -> bool {
    if item.anchor_slot().is_none() {
        return false;
    }
    item.slot = Some(BULK_STORAGE_SLOT.to_string());
    item.placement = None;
    true
}

/// Detach an item from the container it was spliced out of.
///
/// An existing slot name belongs to the old parent, so it becomes
/// [`BULK_STORAGE_SLOT`]; the old coordinates would collide with whatever
/// already sits in the new parent, so they are dropped.
pub fn detach(item: &mut Item) {
    if item.slot.is_some() {
        item.slot = Some(BULK_STORAGE_SLOT.to_string());
    }
    item.placement = None;
}

/// Strip wear, charge, uses, and expiry state from `upd`.
///
/// Returns the number of sub-attributes removed.
pub fn reset_durability(item: &mut Item) -> usize {
    let Some(attributes) = item.attributes.as_mut() else {
        return 0;
    };
    DURABILITY_ATTRIBUTES
        .iter()
        .filter(|key| attributes.shift_remove(**key).is_some())
        .count()
}
