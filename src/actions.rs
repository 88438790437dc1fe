//! The kvman actions, independent of HTTP.
//!
//! Each function performs one operation against a [`KvStore`] and returns the
//! envelope the caller sees. Store failures propagate as errors and are turned
//! into failed envelopes at the HTTP boundary.
//!
//! Missing keys are handled differently per action: `get` reports a failure,
//! while `del` reports success with a "does not exist" message. Clients of the
//! admin API rely on this, so both outcomes are kept as they are.

use anyhow::Result;

use crate::models::{AddRequest, Envelope, ExportEntry, ImportReport, KeyRequest, KeyValuePayload};
use crate::store::KvStore;

/// Insert or overwrite a key. Both cases are successes.
pub async fn add(store: &dyn KvStore, request: AddRequest) -> Result<Envelope> {
    let existed = store.get(&request.key).await?.is_some();
    store.put(&request.key, &request.value).await?;

    if existed {
        tracing::info!("Updated key: {}", request.key);
        Ok(Envelope::ok(format!("Value updated for key {}", request.key)))
    } else {
        tracing::info!("Added key: {}", request.key);
        Ok(Envelope::ok(format!("Key {} added", request.key)))
    }
}

pub async fn get(store: &dyn KvStore, request: KeyRequest) -> Result<Envelope> {
    match store.get(&request.key).await? {
        Some(value) => Ok(Envelope::ok_with(KeyValuePayload {
            key: request.key,
            value,
        })?),
        None => {
            tracing::debug!("Key not found: {}", request.key);
            Ok(Envelope::fail(format!("Key {} does not exist", request.key)))
        }
    }
}

pub async fn list(store: &dyn KvStore) -> Result<Envelope> {
    let keys = store.list_keys().await?;
    tracing::debug!("Listed {} keys", keys.len());
    Ok(Envelope::ok_with(keys)?)
}

/// Dump every record as `{name, value}` entries accepted by [`import`].
pub async fn export(store: &dyn KvStore) -> Result<Envelope> {
    let keys = store.list_keys().await?;

    let mut entries = Vec::with_capacity(keys.len());
    for name in keys {
        // Keys deleted since listing are left out
        if let Some(value) = store.get(&name).await? {
            entries.push(ExportEntry { name, value });
        }
    }

    tracing::info!("Exported {} records", entries.len());
    Ok(Envelope::ok_with(entries)?)
}

/// Insert entries whose key is absent; existing keys are never overwritten.
pub async fn import(store: &dyn KvStore, entries: Vec<ExportEntry>) -> Result<Envelope> {
    let mut report = ImportReport::default();

    for entry in entries {
        if entry.name.is_empty() {
            report.skipped.push(entry.name);
            continue;
        }

        if store.insert_if_absent(&entry.name, &entry.value).await? {
            report.added.push(entry.name);
        } else {
            report.skipped.push(entry.name);
        }
    }

    tracing::info!(
        "Imported {} records, skipped {}",
        report.added.len(),
        report.skipped.len()
    );
    Ok(Envelope::ok_with(report)?)
}

/// Remove a key. A missing key is still a success.
pub async fn del(store: &dyn KvStore, request: KeyRequest) -> Result<Envelope> {
    if store.get(&request.key).await?.is_none() {
        return Ok(Envelope::ok(format!("Key {} does not exist", request.key)));
    }

    store.delete(&request.key).await?;
    tracing::info!("Deleted key: {}", request.key);
    Ok(Envelope::ok(format!("Key {} deleted", request.key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    fn add_request(key: &str, value: &str) -> AddRequest {
        AddRequest {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn key_request(key: &str) -> KeyRequest {
        KeyRequest {
            key: key.to_string(),
        }
    }

    fn entry(name: &str, value: &str) -> ExportEntry {
        ExportEntry {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_then_update() {
        let store = MemoryStore::new();

        let first = add(&store, add_request("key1", "val1234")).await.unwrap();
        assert!(first.success);
        assert_eq!(first.message, "Key key1 added");

        let second = add(&store, add_request("key1", "other")).await.unwrap();
        assert!(second.success);
        assert_eq!(second.message, "Value updated for key key1");

        assert_eq!(store.get("key1").await.unwrap(), Some("other".to_string()));
    }

    #[tokio::test]
    async fn test_get_existing_and_missing() {
        let store = MemoryStore::new();
        store.put("key1", "val1234").await.unwrap();

        let found = get(&store, key_request("key1")).await.unwrap();
        assert!(found.success);
        assert_eq!(found.message, "OK");
        assert_eq!(found.payload, Some(json!({"key": "key1", "value": "val1234"})));

        let missing = get(&store, key_request("non-existent-key")).await.unwrap();
        assert!(!missing.success);
        assert_eq!(missing.message, "Key non-existent-key does not exist");
        assert!(missing.payload.is_none());
    }

    #[tokio::test]
    async fn test_list_empty_and_populated() {
        let store = MemoryStore::new();

        let empty = list(&store).await.unwrap();
        assert!(empty.success);
        assert_eq!(empty.payload, Some(json!([])));

        store.put("b", "2").await.unwrap();
        store.put("a", "1").await.unwrap();
        let populated = list(&store).await.unwrap();
        assert_eq!(populated.payload, Some(json!(["a", "b"])));
    }

    #[tokio::test]
    async fn test_export_reflects_add_and_del() {
        let store = MemoryStore::new();
        add(&store, add_request("key1", "value1")).await.unwrap();

        let exported = export(&store).await.unwrap();
        assert!(exported.success);
        assert_eq!(exported.message, "OK");
        assert_eq!(
            exported.payload,
            Some(json!([{"name": "key1", "value": "value1"}]))
        );

        del(&store, key_request("key1")).await.unwrap();
        let exported = export(&store).await.unwrap();
        assert_eq!(exported.payload, Some(json!([])));
    }

    #[tokio::test]
    async fn test_import_skips_existing_keys() {
        let store = MemoryStore::new();
        let batch = vec![entry("key1", "value1"), entry("key2", "value2")];

        let first = import(&store, batch.clone()).await.unwrap();
        assert!(first.success);
        assert_eq!(first.message, "OK");
        assert_eq!(
            first.payload,
            Some(json!({"added": ["key1", "key2"], "skipped": []}))
        );

        let second = import(&store, batch).await.unwrap();
        assert_eq!(
            second.payload,
            Some(json!({"added": [], "skipped": ["key1", "key2"]}))
        );
    }

    #[tokio::test]
    async fn test_import_never_overwrites() {
        let store = MemoryStore::new();
        store.put("key1", "original").await.unwrap();

        let report = import(&store, vec![entry("key1", "replacement"), entry("key3", "v3")])
            .await
            .unwrap();
        assert_eq!(
            report.payload,
            Some(json!({"added": ["key3"], "skipped": ["key1"]}))
        );
        assert_eq!(store.get("key1").await.unwrap(), Some("original".to_string()));
    }

    #[tokio::test]
    async fn test_import_duplicate_and_empty_names() {
        let store = MemoryStore::new();

        let report = import(
            &store,
            vec![entry("dup", "1"), entry("dup", "2"), entry("", "x")],
        )
        .await
        .unwrap();
        assert_eq!(
            report.payload,
            Some(json!({"added": ["dup"], "skipped": ["dup", ""]}))
        );
        assert_eq!(store.get("dup").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_export_output_imports_cleanly() {
        let source = MemoryStore::new();
        source.put("key1", "value1").await.unwrap();
        source.put("key2", "value2").await.unwrap();

        let exported = export(&source).await.unwrap();
        let entries: Vec<ExportEntry> = serde_json::from_value(exported.payload.unwrap()).unwrap();

        let target = MemoryStore::new();
        let report = import(&target, entries).await.unwrap();
        assert_eq!(
            report.payload,
            Some(json!({"added": ["key1", "key2"], "skipped": []}))
        );
        assert_eq!(target.get("key2").await.unwrap(), Some("value2".to_string()));
    }

    #[tokio::test]
    async fn test_del_existing_and_missing() {
        let store = MemoryStore::new();
        store.put("key1", "val").await.unwrap();

        let deleted = del(&store, key_request("key1")).await.unwrap();
        assert!(deleted.success);
        assert_eq!(deleted.message, "Key key1 deleted");
        assert_eq!(store.get("key1").await.unwrap(), None);

        let missing = del(&store, key_request("non-existent-key")).await.unwrap();
        assert!(missing.success);
        assert_eq!(missing.message, "Key non-existent-key does not exist");
    }

    struct FailingStore;

    #[async_trait]
    impl KvStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow::anyhow!("backend unavailable"))
        }

        async fn put(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow::anyhow!("backend unavailable"))
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Err(anyhow::anyhow!("backend unavailable"))
        }

        async fn list_keys(&self) -> Result<Vec<String>> {
            Err(anyhow::anyhow!("backend unavailable"))
        }
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let store = FailingStore;
        assert!(add(&store, add_request("k", "v")).await.is_err());
        assert!(get(&store, key_request("k")).await.is_err());
        assert!(list(&store).await.is_err());
        assert!(export(&store).await.is_err());
        assert!(import(&store, vec![entry("k", "v")]).await.is_err());
        assert!(del(&store, key_request("k")).await.is_err());
    }
}
