use proptest::prelude::*;
use salvage_core::reconcile::Verdict;
use salvage_core::{Item, ReconcileOptions, reconcile};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

#[path = "generators.rs"]
mod generators;
use generators::*;

fn oracle() -> HashSet<String> {
    HashSet::from([KNOWN.to_string()])
}

type Attachment = (Option<String>, Option<String>, Option<Value>);

fn by_id(items: &[Item]) -> BTreeMap<String, Attachment> {
    items
        .iter()
        .map(|item| {
            (
                item.id.clone(),
                (item.parent_id.clone(), item.slot.clone(), item.placement.clone()),
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn every_item_lands_in_exactly_one_output(items in arb_inventory()) {
        let input: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
        let result = reconcile(items, &[], &oracle(), ReconcileOptions::default()).expect("forest");

        let mut out: Vec<String> = result
            .valid_items
            .iter()
            .chain(&result.residual_items)
            .map(|i| i.id.clone())
            .collect();
        out.sort();
        let mut expected = input;
        expected.sort();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn only_recognized_non_root_items_are_kept(items in arb_inventory()) {
        let result = reconcile(items, &[], &oracle(), ReconcileOptions::default()).expect("forest");

        for item in &result.valid_items {
            prop_assert_eq!(item.template_id.as_str(), KNOWN);
            prop_assert!(item.parent_id.is_some());
        }
        for item in &result.residual_items {
            prop_assert!(item.template_id != KNOWN || item.parent_id.is_none());
        }
    }

    #[test]
    fn kept_items_never_hang_off_a_removed_item(items in arb_inventory()) {
        let result = reconcile(items, &[], &oracle(), ReconcileOptions::default()).expect("forest");

        let verdicts: HashMap<&str, Verdict> = result
            .verdicts
            .iter()
            .map(|v| (v.id.as_str(), v.verdict))
            .collect();
        for item in &result.valid_items {
            let parent = item.parent_id.as_deref().expect("kept items have a parent");
            prop_assert_ne!(verdicts.get(parent).copied(), Some(Verdict::Removed));
            prop_assert!(verdicts.contains_key(parent));
        }
    }

    #[test]
    fn kept_items_never_sit_in_anchor_slots(items in arb_inventory()) {
        let result = reconcile(items, &[], &oracle(), ReconcileOptions::default()).expect("forest");
        for item in &result.valid_items {
            prop_assert!(item.anchor_slot().is_none(), "{} still in {:?}", item.id, item.slot);
        }
    }

    #[test]
    fn sequence_order_does_not_change_the_outcome(items in arb_inventory()) {
        let reversed: Vec<Item> = items.iter().rev().cloned().collect();
        let forward = reconcile(items, &[], &oracle(), ReconcileOptions::default()).expect("forest");
        let backward = reconcile(reversed, &[], &oracle(), ReconcileOptions::default()).expect("forest");

        prop_assert_eq!(by_id(&forward.valid_items), by_id(&backward.valid_items));
        prop_assert_eq!(by_id(&forward.residual_items), by_id(&backward.residual_items));
    }

    #[test]
    fn residual_items_are_read_back_unchanged(items in arb_inventory()) {
        let original = by_id(&items);
        let result = reconcile(items, &[], &oracle(), ReconcileOptions::default()).expect("forest");
        for item in &result.residual_items {
            let (parent, slot, placement) = &original[&item.id];
            prop_assert_eq!(&item.parent_id, parent);
            prop_assert_eq!(&item.slot, slot);
            prop_assert_eq!(&item.placement, placement);
        }
    }
}
