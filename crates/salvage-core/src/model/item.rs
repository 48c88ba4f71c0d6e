use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Slot name of the stash grid every migrated anchor-slot item lands in.
pub const BULK_STORAGE_SLOT: &str = "hideout";

/// `upd` sub-attributes holding wear, charge, uses, and expiry state.
pub const DURABILITY_ATTRIBUTES: [&str; 6] = [
    "MedKit",
    "Repairable",
    "FoodDrink",
    "Key",
    "Resource",
    "RepairKit",
];

/// One node of an inventory forest, in the profile's on-disk shape.
///
/// Keys the model does not name are kept in `extra` so a snapshot written
/// back to disk carries everything it was read with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_tpl")]
    pub template_id: String,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "slotId", default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    /// Grid coordinates, or a cartridge index inside a magazine.
    #[serde(rename = "location", default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Value>,
    #[serde(rename = "upd", default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// A parentless item with the given id and template.
    #[must_use]
    pub fn new(id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            template_id: template_id.into(),
            parent_id: None,
            slot: None,
            placement: None,
            attributes: None,
            extra: Map::new(),
        }
    }

    /// Attach under `parent_id` in `slot`.
    #[must_use]
    pub fn in_slot(mut self, parent_id: impl Into<String>, slot: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self.slot = Some(slot.into());
        self
    }

    #[must_use]
    pub fn at(mut self, placement: Value) -> Self {
        self.placement = Some(placement);
        self
    }

    /// Set one `upd` sub-attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Returns `true` if the item has no parent reference.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The anchor slot this item occupies, if any.
    #[must_use]
    pub fn anchor_slot(&self) -> Option<AnchorSlot> {
        self.slot.as_deref().and_then(|s| s.parse().ok())
    }
}

/// The fixed equipment and storage slots of a character.
///
/// Items found directly in one of these are re-homed to bulk storage when
/// they are migrated, since the receiving character's own slots may be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorSlot {
    FirstPrimaryWeapon,
    SecondPrimaryWeapon,
    Holster,
    Scabbard,
    Compass,
    Headwear,
    Earpiece,
    Eyewear,
    FaceCover,
    ArmBand,
    ArmorVest,
    TacticalVest,
    Backpack,
    Pocket1,
    Pocket2,
    Pocket3,
    Pocket4,
    SpecialSlot1,
    SpecialSlot2,
    SpecialSlot3,
}

impl AnchorSlot {
    pub const ALL: [Self; 20] = [
        Self::FirstPrimaryWeapon,
        Self::SecondPrimaryWeapon,
        Self::Holster,
        Self::Scabbard,
        Self::Compass,
        Self::Headwear,
        Self::Earpiece,
        Self::Eyewear,
        Self::FaceCover,
        Self::ArmBand,
        Self::ArmorVest,
        Self::TacticalVest,
        Self::Backpack,
        Self::Pocket1,
        Self::Pocket2,
        Self::Pocket3,
        Self::Pocket4,
        Self::SpecialSlot1,
        Self::SpecialSlot2,
        Self::SpecialSlot3,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstPrimaryWeapon => "FirstPrimaryWeapon",
            Self::SecondPrimaryWeapon => "SecondPrimaryWeapon",
            Self::Holster => "Holster",
            Self::Scabbard => "Scabbard",
            Self::Compass => "Compass",
            Self::Headwear => "Headwear",
            Self::Earpiece => "Earpiece",
            Self::Eyewear => "Eyewear",
            Self::FaceCover => "FaceCover",
            Self::ArmBand => "ArmBand",
            Self::ArmorVest => "ArmorVest",
            Self::TacticalVest => "TacticalVest",
            Self::Backpack => "Backpack",
            Self::Pocket1 => "pocket1",
            Self::Pocket2 => "pocket2",
            Self::Pocket3 => "pocket3",
            Self::Pocket4 => "pocket4",
            Self::SpecialSlot1 => "SpecialSlot1",
            Self::SpecialSlot2 => "SpecialSlot2",
            Self::SpecialSlot3 => "SpecialSlot3",
        }
    }
}

impl fmt::Display for AnchorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a slot name is not an anchor slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotAnAnchorSlot(pub String);

impl fmt::Display for NotAnAnchorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not an anchor slot", self.0)
    }
}

impl std::error::Error for NotAnAnchorSlot {}

impl FromStr for AnchorSlot {
    type Err = NotAnAnchorSlot;

    /// Slot names are matched exactly; the profile format is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| NotAnAnchorSlot(s.to_string()))
    }
}
