use chrono::{FixedOffset, TimeZone};
use salvage_core::gift::{GiftMailer, GiftOutbox, OutboundGift};
use salvage_core::model::item::BULK_STORAGE_SLOT;
use salvage_core::oracle::TemplateCatalog;
use salvage_core::snapshot::{DirectoryProfileSource, DirectoryResidualWriter};
use salvage_core::{Item, ProfileStatus, ReconcileOptions, RunOptions, reconcile, run};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn ids(items: &[Item]) -> Vec<&str> {
    items.iter().map(|i| i.id.as_str()).collect()
}

#[test]
fn holster_weapon_survives_and_unknown_container_is_spliced_out() {
    let items = vec![
        Item::new("root", "inventory"),
        Item::new("weapon_valid", "pistol")
            .in_slot("root", "Holster")
            .at(json!({ "x": 0, "y": 0, "r": 0 })),
        Item::new("mag", "magazine").in_slot("weapon_valid", "mod_magazine"),
        Item::new("unknown_container", "retired-case").in_slot("root", "hideout"),
        Item::new("key", "key")
            .in_slot("unknown_container", "main")
            .at(json!({ "x": 1, "y": 0, "r": 0 })),
    ];
    let oracle: HashSet<String> = ["pistol", "magazine", "key"]
        .into_iter()
        .map(String::from)
        .collect();

    let result =
        reconcile(items, &["root"], &oracle, ReconcileOptions::default()).expect("forest");

    assert_eq!(ids(&result.valid_items), vec!["weapon_valid", "mag", "key"]);

    let weapon = &result.valid_items[0];
    assert_eq!(weapon.slot.as_deref(), Some(BULK_STORAGE_SLOT));
    assert!(weapon.placement.is_none());

    let mag = &result.valid_items[1];
    assert_eq!(mag.parent_id.as_deref(), Some("weapon_valid"));
    assert_eq!(mag.slot.as_deref(), Some("mod_magazine"));

    let key = &result.valid_items[2];
    assert_eq!(key.parent_id.as_deref(), Some("root"));
    assert_eq!(key.slot.as_deref(), Some(BULK_STORAGE_SLOT));
    assert!(key.placement.is_none());

    // the root container stays behind with the unknown one
    assert_eq!(ids(&result.residual_items), vec!["root", "unknown_container"]);
}

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).expect("encode")).expect("write fixture");
}

fn template(id: &str, parent: &str, kind: &str) -> Value {
    json!({ "_id": id, "_name": id, "_parent": parent, "_type": kind, "_props": {} })
}

fn templates() -> Value {
    json!({
        "54009119af1c881c07000029": template("54009119af1c881c07000029", "", "Node"),
        "55d720f24bdc2d88028b456d": template("55d720f24bdc2d88028b456d", "54009119af1c881c07000029", "Node"),
        "inventory": template("inventory", "55d720f24bdc2d88028b456d", "Item"),
        "pistol": template("pistol", "54009119af1c881c07000029", "Item"),
        "magazine": template("magazine", "54009119af1c881c07000029", "Item"),
        "medkit": template("medkit", "54009119af1c881c07000029", "Item"),
        "dogtag": {
            "_id": "dogtag", "_name": "dogtag", "_parent": "54009119af1c881c07000029",
            "_type": "Item", "_props": { "QuestItem": true }
        }
    })
}

fn profile(username: &str, items: Value) -> Value {
    json!({
        "info": { "id": format!("pid-{username}"), "aid": 100, "username": username, "wipe": false },
        "characters": {
            "pmc": {
                "Info": { "Nickname": username, "Side": "Usec", "Level": 42 },
                "Inventory": { "items": items, "equipment": "eq", "fastPanel": {} },
                "Skills": { "Common": [] }
            },
            "scav": {}
        },
        "achievements": {}
    })
}

#[test]
fn full_run_over_directories() {
    let dir = TempDir::new().expect("temp dir");
    let profiles = dir.path().join("oldProfile");
    let residual = dir.path().join("newProfileWithLeftoverItems");
    fs::create_dir_all(&profiles).expect("mkdir");

    write_json(&dir.path().join("items.json"), &templates());
    write_json(
        &profiles.join("alice.json"),
        &profile(
            "alice",
            json!([
                { "_id": "eq", "_tpl": "inventory" },
                { "_id": "gun", "_tpl": "pistol", "parentId": "eq", "slotId": "Holster" },
                { "_id": "mag", "_tpl": "magazine", "parentId": "gun", "slotId": "mod_magazine" },
                { "_id": "tag", "_tpl": "dogtag", "parentId": "eq", "slotId": "Dogtag" },
                { "_id": "case", "_tpl": "gone", "parentId": "eq", "slotId": "hideout",
                  "location": { "x": 3, "y": 4, "r": "Horizontal" } },
                { "_id": "med", "_tpl": "medkit", "parentId": "case", "slotId": "main",
                  "location": { "x": 0, "y": 0 }, "upd": { "MedKit": { "HpResource": 7 } } }
            ]),
        ),
    );
    fs::write(profiles.join("broken.json"), "{").expect("write broken");

    let catalog =
        TemplateCatalog::load(&dir.path().join("items.json"), HashSet::new()).expect("templates");
    let source = DirectoryProfileSource::new(&profiles);
    let mut outbox = GiftOutbox::open(dir.path().join("gifts.json")).expect("outbox");
    let mut writer = DirectoryResidualWriter::new(&residual);
    let options = RunOptions {
        reconcile: ReconcileOptions {
            reset_durability: true,
        },
        ..RunOptions::default()
    };
    let now = FixedOffset::east_opt(3 * 3600)
        .expect("offset")
        .with_ymd_and_hms(2026, 5, 10, 8, 30, 0)
        .single()
        .expect("time");

    let report = run(&source, &catalog, &mut outbox, &mut writer, &options, &now).expect("run");

    assert_eq!(report.profiles.len(), 2);
    assert_eq!(report.profiles[0].key, "alice");
    assert_eq!(report.profiles[0].status, ProfileStatus::Migrated);
    assert_eq!(report.profiles[1].status, ProfileStatus::Skipped);
    assert!(report.has_failures());

    let gifts: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("gifts.json")).expect("gifts"))
            .expect("json");
    let gift: OutboundGift =
        serde_json::from_value(gifts["gifts"]["ProfileSalvagealice"].clone()).expect("gift");
    assert_eq!(ids(&gift.items), vec!["gun", "mag", "med"]);
    let med = &gift.items[2];
    assert_eq!(med.parent_id.as_deref(), Some("eq"));
    assert_eq!(med.slot.as_deref(), Some(BULK_STORAGE_SLOT));
    assert!(med.attributes.as_ref().is_some_and(|upd| !upd.contains_key("MedKit")));
    assert!(gift.message_text.contains("Total items 6, sending 3 valid items"));
    assert!(gift.message_text.contains("2026-05-17 08:30:00 +03:00"));

    let left: Value = serde_json::from_str(
        &fs::read_to_string(residual.join("alice.json")).expect("residual written"),
    )
    .expect("json");
    let left_ids: Vec<&str> = left["characters"]["pmc"]["Inventory"]["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|i| i["_id"].as_str())
        .collect();
    assert_eq!(left_ids, vec!["eq", "tag", "case"]);
    // untouched fields survive the round trip
    assert_eq!(left["achievements"], json!({}));
    assert_eq!(left["characters"]["pmc"]["Skills"], json!({ "Common": [] }));
    assert_eq!(left["characters"]["pmc"]["Inventory"]["fastPanel"], json!({}));
    assert_eq!(left["info"]["wipe"], json!(false));
    assert!(!residual.join("broken.json").exists());
}

#[test]
fn rerun_replaces_gift_with_same_id() {
    let gift_dir = TempDir::new().expect("temp dir");
    let path = gift_dir.path().join("gifts.json");
    let mut outbox = GiftOutbox::open(&path).expect("outbox");

    let gift: OutboundGift = serde_json::from_value(json!({
        "items": [],
        "sender": "User",
        "senderDetails": {
            "_id": "p", "aid": 1,
            "Info": { "Nickname": "n", "Side": "Bear", "Level": 1,
                      "MemberCategory": 0, "SelectedMemberCategory": 0 }
        },
        "messageText": "first",
        "associatedEvent": "None",
        "collectionTimeHours": 24,
        "maxToSendPlayer": 1
    }))
    .expect("gift");
    outbox.enqueue("g", &gift).expect("first");
    let second = OutboundGift {
        message_text: "second".to_string(),
        ..gift
    };
    outbox.enqueue("g", &second).expect("second");

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(raw["gifts"].as_object().map(serde_json::Map::len), Some(1));
    assert_eq!(raw["gifts"]["g"]["messageText"], "second");
}
