#![allow(dead_code)]

use proptest::prelude::*;
use salvage_core::Item;
use serde_json::json;

/// Template the test oracle recognizes; everything else is unrecognized.
pub const KNOWN: &str = "known";
pub const UNKNOWN: &str = "unknown";

const SLOTS: [&str; 9] = [
    "hideout",
    "main",
    "mod_magazine",
    "mod_sight_rear",
    "Holster",
    "FirstPrimaryWeapon",
    "pocket2",
    "TacticalVest",
    "SecuredContainer",
];

/// An inventory forest in shuffled sequence order.
///
/// Node `i` may only point at a node `< i`, so the links are acyclic; about
/// one node in ten starts a new tree.
pub fn arb_inventory() -> impl Strategy<Value = Vec<Item>> {
    (1usize..40)
        .prop_flat_map(|n| {
            (0..n)
                .map(|i| {
                    let parent = if i == 0 {
                        Just(None).boxed()
                    } else {
                        prop::option::weighted(0.9, 0..i).boxed()
                    };
                    (parent, any::<bool>(), prop::sample::select(SLOTS.to_vec()))
                })
                .collect::<Vec<_>>()
        })
        .prop_map(|nodes| {
            nodes
                .into_iter()
                .enumerate()
                .map(|(i, (parent, known, slot))| {
                    let tpl = if known { KNOWN } else { UNKNOWN };
                    let item = Item::new(format!("i{i}"), tpl);
                    match parent {
                        Some(p) => item.in_slot(format!("i{p}"), slot).at(json!({ "x": i })),
                        None => item,
                    }
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}
