//! JSON-file key-value backend.
//!
//! Stores the whole key-value map as one JSON file under a root directory,
//! so it is easy to inspect, edit, and back up. Reads of an absent file
//! yield an empty map; a corrupt file surfaces a storage error rather than
//! silently dropping data.

use super::KeyValueStore;
use crate::error::{Result, VolumaError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Store filename within the root directory.
const STORE_FILENAME: &str = "voluma.json";

/// File-backed `KeyValueStore` backend.
///
/// Read-modify-write cycles are serialized by an internal async mutex, so
/// individual key writes are atomic with respect to each other.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store rooted at `root_dir` (created on first write).
    #[must_use]
    pub fn new(root_dir: &Path) -> Self {
        Self {
            path: root_dir.join(STORE_FILENAME),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => serde_json::from_str(&body).map_err(|e| {
                VolumaError::Storage(format!("corrupt store at {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(VolumaError::Storage(format!(
                "cannot read store at {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn persist(&self, entries: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VolumaError::Storage(format!("cannot create store dir: {e}")))?;
        }
        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| VolumaError::Storage(format!("cannot serialize store: {e}")))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| VolumaError::Storage(format!("cannot write store: {e}")))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_owned(), value);
        self.persist(&entries).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let mut changed = false;
        for key in keys {
            changed |= entries.remove(key).is_some();
        }
        if changed {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_keys().collect())
    }
}
