//! Durable key/value storage with per-entry expiry

use crate::clock::Clock;
use crate::error::{MuseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Key/value capability used to survive restarts
pub trait PersistenceStore: Send + Sync {
    /// Value for `key`, or `None` when absent or expired
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` for `ttl_days` days; `0` keeps it forever
    fn set(&self, key: &str, value: &str, ttl_days: u32) -> Result<()>;

    fn erase(&self, key: &str) -> Result<()>;
}

/// Stored value with its expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    #[serde(default)]
    pub expires_at_ms: Option<i64>,
}

impl StoredEntry {
    fn new(value: &str, ttl_days: u32, now_ms: i64) -> Self {
        let expires_at_ms = (ttl_days > 0).then(|| now_ms + ttl_days as i64 * MS_PER_DAY);
        Self {
            value: value.to_string(),
            expires_at_ms,
        }
    }

    fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms.map_or(true, |at| now_ms < at)
    }
}

/// In-process store
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.epoch_millis();
        Ok(self
            .entries()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    fn set(&self, key: &str, value: &str, ttl_days: u32) -> Result<()> {
        let entry = StoredEntry::new(value, ttl_days, self.clock.epoch_millis());
        self.entries().insert(key.to_string(), entry);
        Ok(())
    }

    fn erase(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// JSON file store
///
/// The whole file is read on `get` and rewritten on `set`/`erase`; expired
/// entries are dropped whenever the file is written.
pub struct FileStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, StoredEntry>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| MuseError::Store(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, entries: &HashMap<String, StoredEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| MuseError::Store(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Read-modify-write under the write lock; a corrupt file starts over
    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, StoredEntry>),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Discarding unreadable state file: {}", e);
                HashMap::new()
            }
        };

        let now = self.clock.epoch_millis();
        entries.retain(|_, e| e.is_live(now));
        f(&mut entries);

        self.save(&entries)
    }
}

impl PersistenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.epoch_millis();
        let entries = self.load()?;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    fn set(&self, key: &str, value: &str, ttl_days: u32) -> Result<()> {
        let entry = StoredEntry::new(value, ttl_days, self.clock.epoch_millis());
        debug!("Storing {}={} in {}", key, value, self.path.display());
        self.update(|entries| {
            entries.insert(key.to_string(), entry);
        })
    }

    fn erase(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;
    use tempfile::tempdir;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::at_millis(1_700_000_000_000))
    }

    #[test]
    fn test_memory_store_roundtrip_and_erase() {
        let store = MemoryStore::new(clock());
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "3", 365).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("3"));
        store.erase("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_memory_store_expiry() {
        let clock = clock();
        let store = MemoryStore::new(clock.clone());
        store.set("k", "v", 1).unwrap();
        clock.advance(Duration::hours(23));
        assert!(store.get("k").unwrap().is_some());
        clock.advance(Duration::hours(1));
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let clock = clock();
        let store = MemoryStore::new(clock.clone());
        store.set("k", "v", 0).unwrap();
        clock.advance(Duration::days(10_000));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("muse.json");
        let clock = clock();

        FileStore::new(&path, clock.clone()).set("lastQuoteIndex", "4", 365).unwrap();

        let reopened = FileStore::new(&path, clock);
        assert_eq!(reopened.get("lastQuoteIndex").unwrap().as_deref(), Some("4"));
    }

    #[test]
    fn test_file_store_prunes_expired_on_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("muse.json");
        let clock = clock();
        let store = FileStore::new(&path, clock.clone());

        store.set("old", "1", 1).unwrap();
        clock.advance(Duration::days(2));
        store.set("new", "2", 1).unwrap();

        let raw: HashMap<String, StoredEntry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(!raw.contains_key("old"));
        assert!(raw.contains_key("new"));
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("muse.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = FileStore::new(&path, clock());

        assert!(matches!(store.get("k"), Err(MuseError::Store(_))));

        // A write replaces the corrupt document
        store.set("k", "1", 365).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_file_store_erase() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("muse.json"), clock());
        store.set("k", "1", 365).unwrap();
        store.erase("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
