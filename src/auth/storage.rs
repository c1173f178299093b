//! Synchronous key-value storage backing the token store
//!
//! Two backends: a JSON file in the per-user data directory (survives
//! between runs) and an in-memory map (tests, `storage = "memory"`).

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use crate::config::write_private;

/// Origin-scoped string storage with synchronous reads and writes.
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Storage persisted as a flat JSON object of string values.
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path).context("Failed to read storage file")?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).context("Failed to parse storage file")
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("Failed to create storage directory")?;
        }
        let content = serde_json::to_string_pretty(items).context("Failed to serialize storage")?;
        // The file holds bearer tokens
        write_private(&self.path, &content).context("Failed to write storage file")
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(mut items) => items.remove(key),
            Err(e) => {
                tracing::warn!("Ignoring unreadable storage {}: {:#}", self.path.display(), e);
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        // A corrupt file is replaced rather than blocking every future write
        let mut items = self.read_all().unwrap_or_default();
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut items = self.read_all().unwrap_or_default();
        if items.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&items)
    }
}

/// Process-local storage; contents vanish with the process.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let guard = self.items.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.items.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut guard = self.items.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k"), None);

        storage.set_item("k", "v1").unwrap();
        storage.set_item("k", "v2").unwrap();
        assert_eq!(storage.get_item("k"), Some("v2".to_string()));

        storage.remove_item("k").unwrap();
        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k"), None);
    }

    #[test]
    fn test_file_storage_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::new(&path);
        storage.set_item("loginData", "{\"a\":1}").unwrap();
        storage.set_item("other", "x").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get_item("loginData"), Some("{\"a\":1}".to_string()));
        assert_eq!(reopened.get_item("other"), Some("x".to_string()));

        reopened.remove_item("loginData").unwrap();
        assert_eq!(storage.get_item("loginData"), None);
        assert_eq!(storage.get_item("other"), Some("x".to_string()));
    }

    #[test]
    fn test_file_storage_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage.json"));

        assert_eq!(storage.get_item("loginData"), None);
        storage.remove_item("loginData").unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_file_storage_corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get_item("loginData"), None);

        storage.set_item("loginData", "v").unwrap();
        assert_eq!(storage.get_item("loginData"), Some("v".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage.json"));
        storage.set_item("k", "v").unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
