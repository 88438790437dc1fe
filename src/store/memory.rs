use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::KvStore;

/// In-process store, ordered by key
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.keys().cloned().collect())
    }

    async fn insert_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut map = self.inner.write().await;
        if map.contains_key(key) {
            return Ok(false);
        }
        map.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}
