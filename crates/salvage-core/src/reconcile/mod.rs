//! Inventory forest reconciliation.
//!
//! Splits one inventory into the items that can be migrated and the items
//! that stay behind:
//!
//! - **Structural anchors** (parentless items and the inventory's declared
//!   root containers) are never shown to the oracle and never migrated.
//! - **Recognized** items are kept, normalized out of anchor slots, and
//!   optionally stripped of durability state.
//! - **Unrecognized** items are dropped. Their direct children are spliced
//!   onto the dropped item's parent so that nothing recognized is lost with
//!   them; grandchildren keep their links, which still resolve inside the
//!   moved subtree.
//!
//! # Visit order
//!
//! Items are visited root-first (by depth, then by sequence position). A
//! chain of unrecognized items `root → A → B → C` therefore splices `B`
//! onto `root` before `B` itself is visited, and `B` then splices `C` onto
//! its *current* parent, `root`. Splicing compares each descendant's
//! current `parent_id`, so a bottom-up walk would converge to the same
//! forest as well.
//!
//! # Residual items
//!
//! The residual set is the input minus the valid set, by identity. Items
//! that end up there are restored to the attachment they were read with,
//! so a residual snapshot can be fed back through a later run.

pub mod placement;

use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::graph::forest::{ForestError, ForestIndex};
use crate::model::item::Item;
use crate::oracle::ItemValidityOracle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Strip wear/charge/expiry sub-attributes from every kept item.
    pub reset_durability: bool,
}

/// How one item was classified during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Structural container; stays in the residual profile.
    Anchor,
    /// Recognized; migrated.
    Kept,
    /// Unrecognized; stays in the residual profile.
    Removed,
}

impl Verdict {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anchor => "anchor",
            Self::Kept => "kept",
            Self::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemVerdict {
    pub id: String,
    pub template_id: String,
    pub verdict: Verdict,
}

/// Record of one unrecognized item whose children were re-homed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Splice {
    pub removed_id: String,
    pub removed_template: String,
    pub new_parent: String,
    pub rehomed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Kept items, in input order, with their final attachment.
    pub valid_items: Vec<Item>,
    /// Everything else, in input order, with the attachment it was read with.
    pub residual_items: Vec<Item>,
    /// Per-item classification, in input order.
    pub verdicts: Vec<ItemVerdict>,
    pub splices: Vec<Splice>,
}

impl Reconciliation {
    #[must_use]
    pub const fn original_count(&self) -> usize {
        self.valid_items.len() + self.residual_items.len()
    }

    #[must_use]
    pub fn count(&self, verdict: Verdict) -> usize {
        self.verdicts.iter().filter(|v| v.verdict == verdict).count()
    }
}

/// Attachment fields of an item before it was spliced.
#[derive(Debug, Clone)]
struct Attachment {
    parent_id: Option<String>,
    slot: Option<String>,
    placement: Option<Value>,
}

/// Reconcile one inventory against `oracle`.
///
/// `root_containers` lists the ids the inventory declares as its root
/// containers; they are treated as structural anchors even if they have a
/// parent.
///
/// # Errors
///
/// Returns [`ForestError`] if the items do not form a forest (repeated ids
/// or parent cycles). Nothing is classified in that case.
pub fn reconcile<O>(
    items: Vec<Item>,
    root_containers: &[&str],
    oracle: &O,
    options: ReconcileOptions,
) -> Result<Reconciliation, ForestError>
where
    O: ItemValidityOracle + ?Sized,
{
    let anchors: HashSet<&str> = root_containers.iter().copied().collect();
    let mut forest = ForestIndex::build(items)?;
    let mut verdicts = vec![Verdict::Anchor; forest.len()];
    let mut original: HashMap<usize, Attachment> = HashMap::new();
    let mut splices = Vec::new();

    for pos in forest.top_down_order() {
        let item = forest.item_at(pos);
        if item.is_root() || anchors.contains(item.id.as_str()) {
            continue;
        }

        if oracle.is_recognized(&item.template_id) {
            verdicts[pos] = Verdict::Kept;
            let item = forest.item_at_mut(pos);
            if placement::normalize(item) {
                debug!(item = %item.id, "moved out of anchor slot");
            }
            if options.reset_durability {
                placement::reset_durability(item);
            }
        } else {
            verdicts[pos] = Verdict::Removed;
            if let Some(splice) = splice_children(&mut forest, pos, &mut original) {
                splices.push(splice);
            }
        }
    }

    let verdict_list = forest
        .items()
        .iter()
        .zip(&verdicts)
        .map(|(item, &verdict)| ItemVerdict {
            id: item.id.clone(),
            template_id: item.template_id.clone(),
            verdict,
        })
        .collect();

    let mut valid_items = Vec::new();
    let mut residual_items = Vec::new();
    for (pos, (mut item, verdict)) in forest.into_items().into_iter().zip(verdicts).enumerate() {
        if verdict == Verdict::Kept {
            valid_items.push(item);
            continue;
        }
        if let Some(attachment) = original.remove(&pos) {
            item.parent_id = attachment.parent_id;
            item.slot = attachment.slot;
            item.placement = attachment.placement;
        }
        residual_items.push(item);
    }

    Ok(Reconciliation {
        valid_items,
        residual_items,
        verdicts: verdict_list,
        splices,
    })
}

/// Re-home the direct children of the item at `pos` onto its parent.
///
/// The parent is read now, not from the original structure, so a chain of
/// removed items collapses onto the nearest surviving ancestor.
fn splice_children(
    forest: &mut ForestIndex,
    pos: usize,
    original: &mut HashMap<usize, Attachment>,
) -> Option<Splice> {
    let removed = forest.item_at(pos);
    let new_parent = removed.parent_id.clone()?;
    let removed_id = removed.id.clone();
    let removed_template = removed.template_id.clone();

    let direct: Vec<usize> = forest
        .descendant_positions(&removed_id)
        .into_iter()
        .filter(|&d| forest.item_at(d).parent_id.as_deref() == Some(removed_id.as_str()))
        .collect();

    if direct.is_empty() {
        return None;
    }

    let mut rehomed = Vec::with_capacity(direct.len());
    for child_pos in direct {
        let child = forest.item_at_mut(child_pos);
        original.entry(child_pos).or_insert_with(|| Attachment {
            parent_id: child.parent_id.clone(),
            slot: child.slot.clone(),
            placement: child.placement.clone(),
        });
        child.parent_id = Some(new_parent.clone());
        placement::detach(child);
        debug!(item = %child.id, template = %child.template_id, to = %new_parent, "popped out");
        rehomed.push(child.id.clone());
    }

    info!(
        removed = %removed_id,
        template = %removed_template,
        to = %new_parent,
        children = rehomed.len(),
        "unrecognized item, children popped out"
    );

    Some(Splice {
        removed_id,
        removed_template,
        new_parent,
        rehomed,
    })
}
