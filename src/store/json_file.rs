use std::{collections::BTreeMap, fs, path::PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValueStore;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Whole-file JSON store. Every write rewrites the file, which is fine for the
/// handful of per-target entries the pipeline keeps.
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!(
                    "Discarding unreadable store at {}: {err}",
                    path.display()
                );
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub async fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store from {}", self.path.display()))?;
        let data: BTreeMap<String, String> = serde_json::from_str(&contents)?;
        *self.data.write().await = data;
        Ok(())
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write store to {}", self.path.display()))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    /// The in-memory map only changes once the file write succeeded.
    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut guard = self.data.write().await;
        let mut next = guard.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.data.write().await;
        if !guard.contains_key(key) {
            return Ok(());
        }
        let mut next = guard.clone();
        next.remove(key);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}
