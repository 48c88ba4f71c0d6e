//! Arena index over a flat inventory item sequence.
//!
//! A profile stores its inventory as one flat, ordered list of items linked
//! by `parentId`. [`ForestIndex`] takes ownership of that list and answers
//! containment questions without ever nesting the items themselves:
//!
//! - Which items sit directly inside a given item?
//! - What is the full subtree below a given item?
//! - How many parent hops separate an item from its root?
//!
//! # Arena model
//!
//! Items live in a `Vec` in their original order and are addressed by
//! position. The id and parent maps are computed once from the original
//! structure; callers may rewrite `parent_id` on arena items afterwards
//! (see [`ForestIndex::item_at_mut`]) and the maps keep describing the
//! structure the index was built from.
//!
//! # Roots
//!
//! An item is a root when it has no `parent_id` or when its parent id does
//! not resolve inside the forest. Multiple roots are allowed.
//!
//! # Error handling
//!
//! [`ForestIndex::build`] rejects repeated ids and parent cycles with
//! [`ForestError`]; every query afterwards is infallible.

use std::collections::{HashMap, HashSet};

use crate::model::item::Item;

/// Errors raised while indexing an item sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestError {
    /// Two items share the same `_id`.
    #[error("duplicate item id '{0}'")]
    DuplicateId(String),
    /// Following `parentId` links from this item returns to it.
    #[error("parent cycle through item '{0}'")]
    Cycle(String),
}

/// Id and parent indices over an owned arena of items.
#[derive(Debug, Clone)]
pub struct ForestIndex {
    items: Vec<Item>,
    by_id: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
    depths: Vec<usize>,
}

impl ForestIndex {
    /// Index `items`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DuplicateId`] if two items share an id, or
    /// [`ForestError::Cycle`] if parent links loop.
    pub fn build(items: Vec<Item>) -> Result<Self, ForestError> {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();

        for (pos, item) in items.iter().enumerate() {
            if by_id.insert(item.id.clone(), pos).is_some() {
                return Err(ForestError::DuplicateId(item.id.clone()));
            }
            if let Some(parent) = &item.parent_id {
                children.entry(parent.clone()).or_default().push(pos);
            }
        }

        let depths = compute_depths(&items, &by_id)?;

        Ok(Self {
            items,
            by_id,
            children,
            depths,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.position(id).map(|pos| &self.items[pos])
    }

    /// Mutable lookup by id. The same caveats as [`Self::item_at_mut`] apply.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Item> {
        let pos = self.position(id)?;
        Some(&mut self.items[pos])
    }

    /// # Panics
    ///
    /// Panics if `pos` is out of bounds.
    #[must_use]
    pub fn item_at(&self, pos: usize) -> &Item {
        &self.items[pos]
    }

    /// Mutable access for in-place reattachment.
    ///
    /// Changing `id` through this handle is not supported; the id map is
    /// not rebuilt.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is out of bounds.
    pub fn item_at_mut(&mut self, pos: usize) -> &mut Item {
        &mut self.items[pos]
    }

    /// Positions of the direct children of `id`, in sequence order.
    #[must_use]
    pub fn child_positions(&self, id: &str) -> &[usize] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Direct children of `id`, in sequence order.
    #[must_use]
    pub fn children_of(&self, id: &str) -> Vec<&Item> {
        self.child_positions(id)
            .iter()
            .map(|&pos| &self.items[pos])
            .collect()
    }

    /// Positions of every item below `id`, in pre-order, excluding `id`.
    ///
    /// Returns an empty vec for leaves and for ids not in the forest.
    #[must_use]
    pub fn descendant_positions(&self, id: &str) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.child_positions(id).iter().rev().copied().collect();

        while let Some(pos) = stack.pop() {
            out.push(pos);
            stack.extend(self.child_positions(&self.items[pos].id).iter().rev());
        }

        out
    }

    /// Every item below `id`, in pre-order, excluding `id`.
    #[must_use]
    pub fn descendants_of(&self, id: &str) -> Vec<&Item> {
        self.descendant_positions(id)
            .into_iter()
            .map(|pos| &self.items[pos])
            .collect()
    }

    /// Parent hops from `id` to its root in the original structure.
    #[must_use]
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.position(id).map(|pos| self.depths[pos])
    }

    /// All positions ordered root-first: by depth, then by sequence order.
    #[must_use]
    pub fn top_down_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.sort_by_key(|&pos| (self.depths[pos], pos));
        order
    }
}

/// Depth of every item, rejecting cycles.
///
/// Each walk climbs until it reaches a root or an item whose depth is
/// already known, then fills in the chain it climbed.
fn compute_depths(
    items: &[Item],
    by_id: &HashMap<String, usize>,
) -> Result<Vec<usize>, ForestError> {
    let parent_of = |pos: usize| {
        items[pos]
            .parent_id
            .as_deref()
            .and_then(|parent| by_id.get(parent).copied())
    };

    let mut depths: Vec<Option<usize>> = vec![None; items.len()];

    for start in 0..items.len() {
        if depths[start].is_some() {
            continue;
        }

        let mut chain = Vec::new();
        let mut on_chain = HashSet::new();
        let mut cursor = Some(start);

        let base = loop {
            let Some(pos) = cursor else {
                break 0;
            };
            if let Some(known) = depths[pos] {
                break known + 1;
            }
            if !on_chain.insert(pos) {
                return Err(ForestError::Cycle(items[pos].id.clone()));
            }
            chain.push(pos);
            cursor = parent_of(pos);
        };

        for (offset, &pos) in chain.iter().rev().enumerate() {
            depths[pos] = Some(base + offset);
        }
    }

    Ok(depths.into_iter().map(Option::unwrap_or_default).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&Item]) -> Vec<String> {
        items.iter().map(|item| item.id.clone()).collect()
    }

    /// ```text
    /// eq
    /// ├── rig (TacticalVest)
    /// │   ├── mag1
    /// │   │   └── ammo
    /// │   └── mag2
    /// └── bag (Backpack)
    /// stash
    /// ```
    fn sample() -> ForestIndex {
        ForestIndex::build(vec![
            Item::new("eq", "tpl-eq"),
            Item::new("rig", "tpl-rig").in_slot("eq", "TacticalVest"),
            Item::new("mag1", "tpl-mag").in_slot("rig", "1"),
            Item::new("bag", "tpl-bag").in_slot("eq", "Backpack"),
            Item::new("ammo", "tpl-ammo").in_slot("mag1", "cartridges"),
            Item::new("mag2", "tpl-mag").in_slot("rig", "2"),
            Item::new("stash", "tpl-stash"),
        ])
        .expect("sample forest should index")
    }

    #[test]
    fn children_keep_sequence_order() {
        let forest = sample();
        assert_eq!(ids(&forest.children_of("eq")), vec!["rig", "bag"]);
        assert_eq!(ids(&forest.children_of("rig")), vec!["mag1", "mag2"]);
        assert!(forest.children_of("ammo").is_empty());
    }

    #[test]
    fn descendants_are_pre_order_without_self() {
        let forest = sample();
        assert_eq!(
            ids(&forest.descendants_of("eq")),
            vec!["rig", "mag1", "ammo", "mag2", "bag"]
        );
        assert_eq!(ids(&forest.descendants_of("rig")), vec!["mag1", "ammo", "mag2"]);
    }

    #[test]
    fn descendants_of_leaf_or_unknown_is_empty() {
        let forest = sample();
        assert!(forest.descendants_of("ammo").is_empty());
        assert!(forest.descendants_of("stash").is_empty());
        assert!(forest.descendants_of("nope").is_empty());
    }

    #[test]
    fn depth_counts_parent_hops() {
        let forest = sample();
        assert_eq!(forest.depth_of("eq"), Some(0));
        assert_eq!(forest.depth_of("rig"), Some(1));
        assert_eq!(forest.depth_of("ammo"), Some(3));
        assert_eq!(forest.depth_of("stash"), Some(0));
        assert_eq!(forest.depth_of("nope"), None);
    }

    #[test]
    fn dangling_parent_is_treated_as_root() {
        let forest = ForestIndex::build(vec![
            Item::new("orphan", "t").in_slot("missing", "main"),
            Item::new("kid", "t").in_slot("orphan", "main"),
        ])
        .expect("dangling parents are allowed");
        assert_eq!(forest.depth_of("orphan"), Some(0));
        assert_eq!(forest.depth_of("kid"), Some(1));
        assert_eq!(ids(&forest.children_of("missing")), vec!["orphan"]);
    }

    #[test]
    fn top_down_order_sorts_by_depth_then_position() {
        let forest = ForestIndex::build(vec![
            Item::new("c", "t").in_slot("b", "main"),
            Item::new("b", "t").in_slot("a", "main"),
            Item::new("a", "t").in_slot("root", "main"),
            Item::new("root", "t"),
        ])
        .expect("index");
        let order: Vec<&str> = forest
            .top_down_order()
            .into_iter()
            .map(|pos| forest.item_at(pos).id.as_str())
            .collect();
        assert_eq!(order, vec!["root", "a", "b", "c"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = ForestIndex::build(vec![Item::new("x", "t1"), Item::new("x", "t2")])
            .expect_err("duplicate should fail");
        assert_eq!(err, ForestError::DuplicateId("x".to_string()));
    }

    #[test]
    fn parent_cycles_are_rejected() {
        let err = ForestIndex::build(vec![
            Item::new("a", "t").in_slot("b", "main"),
            Item::new("b", "t").in_slot("a", "main"),
        ])
        .expect_err("cycle should fail");
        assert!(matches!(err, ForestError::Cycle(_)));

        let err = ForestIndex::build(vec![Item::new("self", "t").in_slot("self", "main")])
            .expect_err("self-parent should fail");
        assert_eq!(err, ForestError::Cycle("self".to_string()));
    }

    #[test]
    fn mutation_does_not_rewrite_the_index() {
        let mut forest = sample();
        let pos = forest.position("mag2").expect("mag2 exists");
        forest.item_at_mut(pos).parent_id = Some("eq".to_string());
        assert_eq!(ids(&forest.children_of("rig")), vec!["mag1", "mag2"]);
        assert_eq!(forest.get("mag2").and_then(|i| i.parent_id.as_deref()), Some("eq"));

        if let Some(bag) = forest.get_mut("bag") {
            bag.slot = Some("hideout".to_string());
        }
        assert_eq!(forest.get("bag").and_then(|i| i.slot.as_deref()), Some("hideout"));
        assert!(forest.get_mut("nope").is_none());
    }
}
