//! Gift messages that deliver migrated items to the running profile.
//!
//! The shape of [`OutboundGift`] matches the server's gift table entries, so
//! a [`GiftOutbox`] file can be merged into the server's gift config as-is.

use chrono::{DateTime, Days, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SalvageError;
use crate::model::item::Item;
use crate::model::profile::Profile;
use crate::snapshot::write_json_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderKind {
    System,
    Trader,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociatedEvent {
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderInfo {
    #[serde(rename = "Nickname")]
    pub nickname: String,
    #[serde(rename = "Side")]
    pub side: String,
    #[serde(rename = "Level")]
    pub level: u32,
    #[serde(rename = "MemberCategory")]
    pub member_category: i64,
    #[serde(rename = "SelectedMemberCategory")]
    pub selected_member_category: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderDetails {
    #[serde(rename = "_id")]
    pub id: String,
    pub aid: i64,
    #[serde(rename = "Info")]
    pub info: SenderInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundGift {
    pub items: Vec<Item>,
    pub sender: SenderKind,
    pub sender_details: SenderDetails,
    pub message_text: String,
    pub associated_event: AssociatedEvent,
    pub collection_time_hours: u32,
    pub max_to_send_player: u32,
}

/// Mailer key for the gift built from profile `key`.
#[must_use]
pub fn gift_id(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

/// Build the gift carrying `valid_items` out of `profile`.
///
/// `original_count` is the size of the inventory before reconciliation; it
/// only feeds the message body.
#[must_use]
pub fn assemble_gift<Tz>(
    key: &str,
    profile: &Profile,
    valid_items: Vec<Item>,
    original_count: usize,
    expiration_days: u32,
    sent_at: &DateTime<Tz>,
) -> OutboundGift
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let pmc = &profile.characters.pmc.info;
    let held_until = sent_at
        .clone()
        .checked_add_days(Days::new(u64::from(expiration_days)))
        .map_or_else(|| "indefinitely".to_string(), |t| format_time(&t));

    let message_text = format!(
        "Old profile from: {username}({key})\n\
         Total items {original_count}, sending {valid} valid items\n\
         Sent at {sent}\n\
         Storage window is {expiration_days} days\n\
         Items held until {held_until}",
        username = profile.info.username,
        valid = valid_items.len(),
        sent = format_time(sent_at),
    );

    OutboundGift {
        items: valid_items,
        sender: SenderKind::User,
        sender_details: SenderDetails {
            id: profile.info.id.clone(),
            aid: profile.info.aid,
            info: SenderInfo {
                nickname: pmc.nickname.clone(),
                side: pmc.side.clone(),
                level: pmc.level,
                member_category: pmc.member_category,
                selected_member_category: pmc.selected_member_category,
            },
        },
        message_text,
        associated_event: AssociatedEvent::None,
        collection_time_hours: expiration_days.saturating_mul(24),
        max_to_send_player: 1,
    }
}

fn format_time<Tz>(t: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    t.format("%Y-%m-%d %H:%M:%S %:z").to_string()
}

/// Hands a gift to whatever delivers it.
///
/// Enqueuing the same id twice replaces the earlier gift.
pub trait GiftMailer {
    /// # Errors
    ///
    /// Returns [`SalvageError`] if the gift cannot be recorded.
    fn enqueue(&mut self, gift_id: &str, gift: &OutboundGift) -> Result<(), SalvageError>;
}

impl GiftMailer for BTreeMap<String, OutboundGift> {
    fn enqueue(&mut self, gift_id: &str, gift: &OutboundGift) -> Result<(), SalvageError> {
        self.insert(gift_id.to_string(), gift.clone());
        Ok(())
    }
}

/// A `{ "gifts": { "<id>": <gift>, ... } }` document on disk.
///
/// Existing entries are kept, entries with the same id are replaced, and
/// the file is rewritten after every enqueue so that gifts from earlier
/// profiles survive a failure later in the run.
#[derive(Debug, Clone)]
pub struct GiftOutbox {
    path: PathBuf,
    document: Map<String, Value>,
}

impl GiftOutbox {
    /// Open `path`, starting empty if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`SalvageError::Write`] if an existing file cannot be read, or
    /// [`SalvageError::Json`] if it is not a JSON object.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SalvageError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                document: Map::new(),
            });
        }

        let content = fs::read_to_string(&path).map_err(|source| SalvageError::Write {
            path: path.clone(),
            source,
        })?;
        let document = serde_json::from_str(&content).map_err(|source| SalvageError::Json {
            what: format!("gift outbox {}", path.display()),
            source,
        })?;
        Ok(Self { path, document })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ids currently in the outbox.
    #[must_use]
    pub fn gift_ids(&self) -> Vec<&str> {
        self.document
            .get("gifts")
            .and_then(Value::as_object)
            .map(|gifts| gifts.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl GiftMailer for GiftOutbox {
    fn enqueue(&mut self, gift_id: &str, gift: &OutboundGift) -> Result<(), SalvageError> {
        let encoded = serde_json::to_value(gift).map_err(|source| SalvageError::Json {
            what: format!("gift {gift_id}"),
            source,
        })?;

        let gifts = self
            .document
            .entry("gifts")
            .or_insert_with(|| Value::Object(Map::new()));
        if !gifts.is_object() {
            *gifts = Value::Object(Map::new());
        }
        if let Value::Object(gifts) = gifts {
            gifts.insert(gift_id.to_string(), encoded);
        }

        write_json_atomic(&self.path, &self.document, "gift outbox")
    }
}
