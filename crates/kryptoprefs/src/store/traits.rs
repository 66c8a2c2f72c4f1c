//! Store trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// File-scoped key/value storage underneath [`KryptoPrefs`](crate::KryptoPrefs)
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Retrieve the raw value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a raw value, replacing any previous one
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value by key
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn contains(&self, key: &str) -> Result<bool>;

    /// Number of stored entries
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// List all stored entry names
    async fn keys(&self) -> Result<Vec<String>>;

    /// Clear all stored data
    async fn clear(&self) -> Result<()>;

    /// Name of the preference file this store holds
    fn name(&self) -> &str;

    /// Get a human-readable name for this storage backend
    fn backend_name(&self) -> &'static str;
}
