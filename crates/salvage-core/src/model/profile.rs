//! Saved profile documents.
//!
//! Only the fields the salvage pass reads or rewrites are modeled. Every
//! other key, at every level, is carried through `extra` maps so that the
//! residual snapshot is the input document minus the migrated items.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::item::Item;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub info: AccountInfo,
    pub characters: Characters,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    pub const fn inventory(&self) -> &Inventory {
        &self.characters.pmc.inventory
    }

    pub const fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.characters.pmc.inventory
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub aid: i64,
    #[serde(default)]
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characters {
    pub pmc: Character,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    #[serde(rename = "Info")]
    pub info: CharacterInfo,
    #[serde(rename = "Inventory")]
    pub inventory: Inventory,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The character summary copied into a gift's sender details.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterInfo {
    #[serde(rename = "Nickname", default)]
    pub nickname: String,
    #[serde(rename = "Side", default)]
    pub side: String,
    #[serde(rename = "Level", default)]
    pub level: u32,
    #[serde(rename = "MemberCategory", default)]
    pub member_category: i64,
    #[serde(rename = "SelectedMemberCategory", default)]
    pub selected_member_category: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorting_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_raid_items: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_stash_items: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Inventory {
    /// Ids of the declared root containers, in declaration order.
    #[must_use]
    pub fn root_containers(&self) -> Vec<&str> {
        [
            &self.equipment,
            &self.stash,
            &self.sorting_table,
            &self.quest_raid_items,
            &self.quest_stash_items,
        ]
        .into_iter()
        .filter_map(Option::as_deref)
        .collect()
    }
}
