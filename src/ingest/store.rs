//! Snapshot stores
//!
//! Every key is written as a whole; a `null` value clears the key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Error, Result};

/// Key/value tree the snapshot is written to
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Overwrite `key` with `value`, or remove it when `value` is null
    async fn put(&self, key: &str, value: &Value) -> Result<()>;
}

/// One pretty-printed `<key>.json` file per key under a directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonDirStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl ScheduleStore for JsonDirStore {
    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.path_for(key);
        let store_error = |e: std::io::Error| Error::Store {
            key: key.to_string(),
            message: format!("{}: {e}", path.display()),
        };

        if value.is_null() {
            return match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(store_error(e)),
            };
        }

        let json = serde_json::to_vec_pretty(value)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(store_error)?;
        tokio::fs::write(&path, json).await.map_err(store_error)?;
        tracing::debug!(key, path = %path.display(), "stored");
        Ok(())
    }
}

/// In-process store, mostly for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        let mut values = self.values.lock();
        if value.is_null() {
            values.remove(key);
        } else {
            values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}
