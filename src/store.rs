use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::import::{import_batch, ImportOptions};
use crate::models::{ImportSummary, Lead};

/// Persisted document: every lead plus the time of the last mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    #[serde(default)]
    pub leads: Vec<Lead>,
    #[serde(default, with = "crate::models::iso_millis_option")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Durable backing for [`LeadStore`]. Each save replaces the whole document.
pub trait Persistence: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> anyhow::Result<Option<StoreData>>;
    fn save(&self, data: &StoreData) -> anyhow::Result<()>;
}

/// Pretty-printed JSON file, replaced atomically via a sibling temp file.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "data.json".into());
        name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }
}

impl Persistence for JsonFilePersistence {
    fn load(&self) -> anyhow::Result<Option<StoreData>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let data = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(data))
    }

    fn save(&self, data: &StoreData) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let json = serde_json::to_string_pretty(data).context("Failed to serialize store")?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("Failed to move {} into place", tmp.display()));
        }
        Ok(())
    }
}

/// In-process persistence for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    saved: Mutex<Option<StoreData>>,
    saves: Mutex<usize>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: StoreData) -> Self {
        Self {
            saved: Mutex::new(Some(data)),
            saves: Mutex::new(0),
        }
    }

    /// Last document written, if any.
    pub fn snapshot(&self) -> Option<StoreData> {
        self.saved.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|guard| *guard).unwrap_or(0)
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> anyhow::Result<Option<StoreData>> {
        Ok(self.snapshot())
    }

    fn save(&self, data: &StoreData) -> anyhow::Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *saved = Some(data.clone());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

/// The lead collection owned by the serving process.
///
/// Loaded once at startup and flushed in full after every mutation. Storage
/// failures are logged and swallowed so the service keeps running on its
/// in-memory state.
pub struct LeadStore {
    data: StoreData,
    persistence: Arc<dyn Persistence>,
}

impl LeadStore {
    /// Loads the persisted document, starting empty when it is missing or unreadable.
    pub fn open(persistence: Arc<dyn Persistence>) -> Self {
        match Self::try_open(persistence.clone()) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Could not load stored leads: {:#}", e);
                Self {
                    data: StoreData::default(),
                    persistence,
                }
            }
        }
    }

    /// Like [`LeadStore::open`], but an unreadable document is an error instead of
    /// an empty store. Offline tools use this so they never overwrite data they
    /// could not read.
    pub fn try_open(persistence: Arc<dyn Persistence>) -> anyhow::Result<Self> {
        let data = match persistence.load()? {
            Some(data) => {
                tracing::info!("Loaded {} lead(s) from storage", data.leads.len());
                data
            }
            None => {
                tracing::info!("No stored leads found, starting empty");
                StoreData::default()
            }
        };

        Ok(Self { data, persistence })
    }

    pub fn leads(&self) -> &[Lead] {
        &self.data.leads
    }

    pub fn len(&self) -> usize {
        self.data.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.leads.is_empty()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.data.last_updated
    }

    /// Appends a live lead and flushes.
    pub fn append(&mut self, lead: Lead) {
        self.data.leads.push(lead);
        self.commit();
    }

    /// Runs a bulk import (see [`import_batch`]) and flushes.
    pub fn import(&mut self, raws: &[Value], options: &ImportOptions) -> ImportSummary {
        let summary = import_batch(&mut self.data.leads, raws, options, Utc::now());
        self.commit();
        summary
    }

    /// Removes every lead, or only those of one scorecard. Returns how many were removed.
    pub fn purge(&mut self, scorecard_id: Option<&str>) -> usize {
        let before = self.data.leads.len();
        match scorecard_id {
            Some(id) => self.data.leads.retain(|lead| lead.scorecard_id != id),
            None => self.data.leads.clear(),
        }
        let removed = before - self.data.leads.len();
        self.commit();
        removed
    }

    fn commit(&mut self) {
        self.data.last_updated = Some(Utc::now());
        if let Err(e) = self.persistence.save(&self.data) {
            tracing::warn!("Could not persist leads: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use serde_json::json;

    struct FailingPersistence;

    impl Persistence for FailingPersistence {
        fn load(&self) -> anyhow::Result<Option<StoreData>> {
            anyhow::bail!("disk on fire")
        }

        fn save(&self, _data: &StoreData) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }
    }

    #[test]
    fn test_append_flushes_every_mutation() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut store = LeadStore::open(persistence.clone());
        assert!(store.is_empty());
        assert!(store.last_updated().is_none());

        store.append(normalize(&json!({"email": "a@b.com"}), None, None));
        store.append(normalize(&json!({"email": "c@d.com"}), None, None));

        assert_eq!(persistence.save_count(), 2);
        let saved = persistence.snapshot().unwrap();
        assert_eq!(saved.leads.len(), 2);
        assert_eq!(saved.last_updated, store.last_updated());
    }

    #[test]
    fn test_purge_one_scorecard() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut store = LeadStore::open(persistence.clone());
        store.append(normalize(&json!({}), Some("a"), None));
        store.append(normalize(&json!({}), Some("b"), None));
        store.append(normalize(&json!({}), Some("a"), None));

        assert_eq!(store.purge(Some("a")), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge(None), 1);
        assert!(store.is_empty());
        assert!(persistence.snapshot().unwrap().leads.is_empty());
    }

    #[test]
    fn test_storage_failures_are_swallowed() {
        let mut store = LeadStore::open(Arc::new(FailingPersistence));
        assert!(store.is_empty());
        store.append(normalize(&json!({"email": "a@b.com"}), None, None));
        assert_eq!(store.len(), 1);
        assert!(store.last_updated().is_some());
    }

    #[test]
    fn test_reopen_restores_state() {
        let persistence = Arc::new(MemoryPersistence::new());
        {
            let mut store = LeadStore::open(persistence.clone());
            store.import(
                &[json!({"email": "a@b.com", "receivedAt": "2026-01-01T00:00:00Z"})],
                &ImportOptions::default(),
            );
        }
        let store = LeadStore::open(persistence);
        assert_eq!(store.len(), 1);
        assert!(store.leads()[0].imported);
    }
}
