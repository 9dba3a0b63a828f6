use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use rust_scoreapp_api::import::ImportOptions;
use rust_scoreapp_api::normalizer::normalize;
use rust_scoreapp_api::store::{JsonFilePersistence, LeadStore, Persistence, StoreData};

/// Fresh directory under the system temp dir, removed when dropped.
struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("scoreapp-test-{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[test]
fn file_store_round_trip() {
    let dir = TempDir::new();
    let path = dir.0.join("data.json");

    {
        let mut store = LeadStore::open(Arc::new(JsonFilePersistence::new(&path)));
        store.append(normalize(&json!({"email": "a@b.com", "score": 72}), Some("quiz"), Some("Quiz")));
        store.import(
            &[json!({"email": "old@b.com", "receivedAt": "2025-12-24T18:00:00Z"})],
            &ImportOptions::default(),
        );
    }

    let reopened = LeadStore::open(Arc::new(JsonFilePersistence::new(&path)));
    assert_eq!(reopened.len(), 2);
    assert!(reopened.last_updated().is_some());
    // import re-sorted the store chronologically
    assert_eq!(reopened.leads()[0].email, "old@b.com");
    assert_eq!(reopened.leads()[1].score, Some(72));
    assert_eq!(reopened.leads()[1].scorecard_name, "Quiz");

    // no temp files left behind
    let entries: Vec<_> = std::fs::read_dir(&dir.0).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn missing_file_starts_empty() {
    let dir = TempDir::new();
    let persistence = JsonFilePersistence::new(dir.0.join("absent.json"));
    assert_eq!(persistence.load().unwrap(), None);

    let store = LeadStore::open(Arc::new(persistence));
    assert!(store.is_empty());
}

#[test]
fn corrupt_file_starts_empty_and_is_replaced_on_next_write() {
    let dir = TempDir::new();
    let path = dir.0.join("data.json");
    std::fs::write(&path, "{ half a document").unwrap();

    let persistence = JsonFilePersistence::new(&path);
    assert!(persistence.load().is_err());

    let mut store = LeadStore::open(Arc::new(persistence.clone()));
    assert!(store.is_empty());
    store.append(normalize(&json!({"email": "a@b.com"}), None, None));

    let data: StoreData = persistence.load().unwrap().unwrap();
    assert_eq!(data.leads.len(), 1);
}

#[test]
fn strict_open_refuses_unreadable_file_and_leaves_it_alone() {
    let dir = TempDir::new();
    let path = dir.0.join("data.json");
    let document = r#"{"leads": [{"id": "keep-me", "receivedAt": "2026-02-19T21:20:00.123Z"}], "lastUpdated": "not a date"}"#;
    std::fs::write(&path, document).unwrap();

    let result = LeadStore::try_open(Arc::new(JsonFilePersistence::new(&path)));
    assert!(result.is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), document);
}

#[test]
fn strict_open_accepts_missing_file() {
    let dir = TempDir::new();
    let path = dir.0.join("data.json");

    let mut store = LeadStore::try_open(Arc::new(JsonFilePersistence::new(&path))).unwrap();
    assert!(store.is_empty());
    let summary = store.import(&[json!({"email": "a@b.com"})], &ImportOptions::default());
    assert_eq!(summary.imported, 1);
    assert!(std::fs::read_to_string(&path).unwrap().contains("a@b.com"));
}

#[test]
fn reads_document_written_by_legacy_server() {
    let dir = TempDir::new();
    let path = dir.0.join("data.json");
    let legacy = json!({
        "leads": [{
            "id": "1739999999999",
            "receivedAt": "2026-02-19T21:20:00.123Z",
            "name": "Ukendt",
            "email": "legacy@example.dk",
            "phone": "",
            "company": "",
            "utmSource": "meta",
            "utmMedium": "",
            "utmCampaign": "",
            "utmContent": "",
            "utmTerm": "",
            "source": "meta",
            "score": null,
            "scoreLabel": "",
            "scoreCategory": "",
            "meetingBooked": false,
            "raw": {"email": "legacy@example.dk", "utm_source": "meta"}
        }],
        "lastUpdated": "2026-02-19T21:20:00.456Z"
    });
    std::fs::write(&path, serde_json::to_string_pretty(&legacy).unwrap()).unwrap();

    let store = LeadStore::open(Arc::new(JsonFilePersistence::new(&path)));
    assert_eq!(store.len(), 1);
    let lead = &store.leads()[0];
    assert_eq!(lead.scorecard_id, "default");
    assert_eq!(lead.utm_source, "meta");
    assert_eq!(lead.received_date(), "2026-02-19");
}

#[test]
fn save_creates_missing_parent_directory() {
    let dir = TempDir::new();
    let path = dir.0.join("nested").join("data.json");
    let persistence = JsonFilePersistence::new(&path);

    persistence.save(&StoreData::default()).unwrap();
    assert!(path.exists());
    assert_eq!(persistence.path(), path.as_path());
}
