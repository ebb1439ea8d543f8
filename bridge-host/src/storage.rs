//! Key-Value Store Implementations
//!
//! Two adapters for the [`KeyValueStore`] trait: an in-memory map for tests
//! and short-lived tooling, and a JSON-file-backed store for durable host
//! persistence.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Volatile in-memory key-value store
///
/// Contents are lost when the process exits. Useful for tests and ephemeral
/// sessions.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        Ok(())
    }
}

/// JSON-file-backed key-value store
///
/// The full map is held in memory and rewritten to disk after every mutation.
/// Writes go through a temp file followed by a rename so a crash mid-write
/// never leaves a truncated store behind.
pub struct JsonFileKeyValueStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl JsonFileKeyValueStore {
    /// Open a store at the given path, loading existing contents if present.
    ///
    /// A corrupted store file is discarded with a warning rather than
    /// preventing startup.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read(&path).await {
            Ok(data) => match serde_json::from_slice::<HashMap<String, String>>(&data) {
                Ok(map) => {
                    debug!(keys = map.len(), "Loaded key-value store from disk");
                    map
                }
                Err(e) => {
                    warn!(error = %e, "Key-value store file is corrupted, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| BridgeError::OperationFailed(format!("Serialization failed: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileKeyValueStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.persist(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryKeyValueStore::new();

        store.set("token", "abc123").await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), Some("abc123".to_string()));
        assert!(store.has("token").await.unwrap());

        store.remove("token").await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = MemoryKeyValueStore::new();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();

        store.clear().await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!("kv-store-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("store.json");

        {
            let store = JsonFileKeyValueStore::open(&path).await.unwrap();
            store.set("user", "{\"id\":1}").await.unwrap();
        }

        let reopened = JsonFileKeyValueStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("user").await.unwrap(),
            Some("{\"id\":1}".to_string())
        );

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_file_store_tolerates_corrupted_file() {
        let dir = std::env::temp_dir().join(format!("kv-store-corrupt-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("store.json");
        tokio::fs::write(&path, b"not json at all").await.unwrap();

        let store = JsonFileKeyValueStore::open(&path).await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
