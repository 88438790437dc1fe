//! Key-value store capability used by the kvman actions.

mod memory;
mod spanner;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use spanner::SpannerStore;

/// Minimal capability set the admin API needs from a key-value backend.
///
/// Implementations must be safe to share across request handlers.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All keys in ascending order.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Store `value` only when `key` is absent. Returns whether it was stored.
    async fn insert_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        if self.get(key).await?.is_some() {
            return Ok(false);
        }
        self.put(key, value).await?;
        Ok(true)
    }

    /// Verify the backend is reachable.
    async fn health_check(&self) -> Result<()> {
        self.list_keys().await.map(|_| ())
    }
}
