//! Item validity lookup.
//!
//! The reconciliation pass asks one question of the outside world: is this
//! template id a currently recognized item type? [`ItemValidityOracle`] is
//! that question. [`TemplateCatalog`] answers it from the game's item
//! template table; a plain `HashSet<String>` answers it from an allow-list.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;
use std::path::Path;

use crate::error::SalvageError;

/// Base classes whose descendants are containers of the world or of the
/// character itself, never items a player can own.
pub const STRUCTURAL_BASE_CLASSES: [&str; 7] = [
    "566965d44bdc2d814c8b4571", // loot container
    "5448bf274bdc2dfc2f8b456a", // mob container
    "566abbb64bdc2d144c8b457d", // stash
    "6050cac987d3f925bf016837", // sorting table
    "55d720f24bdc2d88028b456d", // inventory
    "567583764bdc2d98058b456e", // stationary container
    "557596e64bdc2dc2118b4571", // pockets
];

/// Answers whether a template id names a recognized item type.
///
/// Implementations must be total and side-effect free for the duration of
/// a run: anything that cannot be classified is reported as unrecognized.
pub trait ItemValidityOracle {
    fn is_recognized(&self, template_id: &str) -> bool;
}

impl<T: ItemValidityOracle + ?Sized> ItemValidityOracle for &T {
    fn is_recognized(&self, template_id: &str) -> bool {
        (**self).is_recognized(template_id)
    }
}

impl<S: BuildHasher> ItemValidityOracle for HashSet<String, S> {
    fn is_recognized(&self, template_id: &str) -> bool {
        self.contains(template_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TemplateKind {
    Item,
    Node,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TemplateProps {
    #[serde(rename = "QuestItem", default)]
    pub quest_item: bool,
}

/// One entry of the item template table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Template {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_name", default)]
    pub name: String,
    #[serde(rename = "_parent", default)]
    pub parent: String,
    #[serde(rename = "_type")]
    pub kind: TemplateKind,
    #[serde(rename = "_props", default)]
    pub props: TemplateProps,
}

/// Oracle backed by the item template table.
///
/// A template is recognized when it exists, is a concrete `Item` (not a
/// category `Node`), is not a quest item, is not blacklisted, and does not
/// descend from any of [`STRUCTURAL_BASE_CLASSES`].
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<String, Template>,
    blacklist: HashSet<String>,
}

impl TemplateCatalog {
    #[must_use]
    pub fn new(templates: impl IntoIterator<Item = Template>, blacklist: HashSet<String>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|template| (template.id.clone(), template))
                .collect(),
            blacklist,
        }
    }

    /// Load the template table (`{ "<tpl>": { "_id": ..., ... } }`) from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SalvageError::TemplateLoad`] if the file cannot be read or
    /// is not a template table.
    pub fn load(path: &Path, blacklist: HashSet<String>) -> Result<Self, SalvageError> {
        let to_err = |reason: String| SalvageError::TemplateLoad {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| to_err(e.to_string()))?;
        let table: HashMap<String, Template> =
            serde_json::from_str(&content).map_err(|e| to_err(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            templates = table.len(),
            blacklisted = blacklist.len(),
            "loaded item template table"
        );

        Ok(Self::new(table.into_values(), blacklist))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    #[must_use]
    pub fn get(&self, template_id: &str) -> Option<&Template> {
        self.templates.get(template_id)
    }

    /// Returns `true` if `template_id` is `base` or has `base` among its
    /// `_parent` ancestors.
    #[must_use]
    pub fn is_of_base_class(&self, template_id: &str, base: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = template_id;

        loop {
            if current == base {
                return true;
            }
            if !visited.insert(current) {
                return false; // cycle guard
            }
            match self.templates.get(current) {
                Some(template) if !template.parent.is_empty() => current = &template.parent,
                _ => return false,
            }
        }
    }
}

impl ItemValidityOracle for TemplateCatalog {
    fn is_recognized(&self, template_id: &str) -> bool {
        let Some(template) = self.templates.get(template_id) else {
            return false;
        };

        template.kind == TemplateKind::Item
            && !template.props.quest_item
            && !self.blacklist.contains(template_id)
            && !STRUCTURAL_BASE_CLASSES
                .iter()
                .any(|base| self.is_of_base_class(template_id, base))
    }
}
