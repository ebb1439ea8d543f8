//! Key-Value Storage Abstraction
//!
//! Provides a host-agnostic trait for string key-value persistence, the
//! equivalent of browser `localStorage` or platform preference stores.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value storage trait
///
/// Abstracts host-specific persistence:
/// - Desktop: JSON file or OS-specific preferences
/// - Embedded/test: in-memory map
/// - Web shells: localStorage
///
/// Values are plain strings; callers serialize structured data (JSON) before
/// storing. Tokens pass through this store, so implementations must never log
/// stored values.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore) -> Result<()> {
///     store.set("theme", "dark").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a value under a key, overwriting any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove a key; succeeds even if the key doesn't exist
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if a key exists without retrieving it
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// List all stored keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Remove all stored keys
    async fn clear(&self) -> Result<()>;
}
