//! Durable key-value storage
//!
//! The library is saved as one JSON string under a fixed key. `JsonFileStore`
//! keeps every key in a single JSON object on disk.

use crate::utils::error::AppResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// String key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    fn remove(&self, key: &str) -> AppResult<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store, creating an empty one if the file does not exist.
    ///
    /// A file that does not parse is replaced by an empty store.
    pub fn open(path: &Path) -> AppResult<Self> {
        let mut corrupt = false;
        let values: BTreeMap<String, String> = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).unwrap_or_else(|e| {
                    tracing::warn!("Discarding corrupt store {:?}: {}", path, e);
                    corrupt = true;
                    BTreeMap::new()
                })
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened store {:?} with {} key(s)", path, values.len());

        let store = Self {
            path: path.to_path_buf(),
            values: RwLock::new(values),
        };
        if corrupt {
            // A failed overwrite is retried by the next write
            if let Err(e) = store.flush(&store.values.read()) {
                tracing::warn!("Failed to reset store {:?}: {}", path, e);
            }
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all keys through a temp file so a crash never leaves half a file
    fn flush(&self, values: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string(values)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut values = self.values.write();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}
