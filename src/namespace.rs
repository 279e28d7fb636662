//! Namespace Store
//!
//! Translates namespace-scoped operations into composite-key operations on a
//! [`StorageBackend`]. Knows nothing about expiration or search.

use crate::error::Result;
use crate::storage::{CompositeKey, StorageBackend, StorageEntry};
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Key → value mapping of one namespace (or a subset of it).
pub type Entries = BTreeMap<String, Value>;

/// A set of keys to read or delete.
///
/// Built from one key, a list of keys, or the keys of an [`Entries`] map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyList(Vec<String>);

impl KeyList {
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for KeyList {
    fn from(key: &str) -> Self {
        Self(vec![key.to_string()])
    }
}

impl From<String> for KeyList {
    fn from(key: String) -> Self {
        Self(vec![key])
    }
}

impl From<Vec<String>> for KeyList {
    fn from(keys: Vec<String>) -> Self {
        Self(keys)
    }
}

impl From<Vec<&str>> for KeyList {
    fn from(keys: Vec<&str>) -> Self {
        Self(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for KeyList {
    fn from(keys: &[&str]) -> Self {
        Self(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl From<&[String]> for KeyList {
    fn from(keys: &[String]) -> Self {
        Self(keys.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for KeyList {
    fn from(keys: [&str; N]) -> Self {
        Self(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl From<&Entries> for KeyList {
    fn from(entries: &Entries) -> Self {
        Self(entries.keys().cloned().collect())
    }
}

/// Namespace-scoped access to a shared storage backend.
///
/// Cheap to clone. Several stores over the same backend and namespace see
/// the same data.
#[derive(Clone)]
pub struct NamespaceStore {
    backend: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for NamespaceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceStore").finish_non_exhaustive()
    }
}

impl NamespaceStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Every key → value pair in `namespace`.
    ///
    /// Returns `Ok(None)` for an empty namespace name and an empty map for a
    /// namespace without entries.
    pub async fn get_all(&self, namespace: &str) -> Result<Option<Entries>> {
        if namespace.is_empty() {
            return Ok(None);
        }

        let rows = self.backend.where_namespace(namespace).await?;
        Ok(Some(collect_entries(rows)))
    }

    /// Only the requested keys that exist. `None` reads the whole namespace.
    pub async fn get(&self, namespace: &str, keys: Option<KeyList>) -> Result<Option<Entries>> {
        let Some(keys) = keys else {
            return self.get_all(namespace).await;
        };
        if namespace.is_empty() {
            return Ok(None);
        }

        let lookup: Vec<CompositeKey> = keys
            .into_inner()
            .into_iter()
            .map(|key| CompositeKey::new(namespace, key))
            .collect();

        let rows = self.backend.bulk_get(&lookup).await?;
        Ok(Some(collect_entries(rows)))
    }

    /// Upserts every item in one batch.
    pub async fn set(&self, namespace: &str, items: Entries) -> Result<()> {
        let rows: Vec<StorageEntry> = items
            .into_iter()
            .map(|(key, value)| StorageEntry::new(namespace, key, value))
            .collect();

        debug!(namespace, rows = rows.len(), "set");
        self.backend.bulk_put(rows).await
    }

    /// Deletes the given keys in one batch. Absent keys are ignored.
    pub async fn remove(&self, namespace: &str, keys: impl Into<KeyList>) -> Result<()> {
        let doomed: Vec<CompositeKey> = keys
            .into()
            .into_inner()
            .into_iter()
            .map(|key| CompositeKey::new(namespace, key))
            .collect();

        debug!(namespace, rows = doomed.len(), "remove");
        self.backend.bulk_delete(doomed).await
    }

    /// Deletes every entry in `namespace`.
    pub async fn clear(&self, namespace: &str) -> Result<()> {
        let removed = self.backend.delete_namespace(namespace).await?;
        debug!(namespace, removed, "clear");
        Ok(())
    }

    /// All keys of `namespace`, in backend index order.
    pub async fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        Ok(self
            .backend
            .primary_keys(namespace)
            .await?
            .into_iter()
            .map(|ck| ck.key)
            .collect())
    }

    /// Number of entries in `namespace`.
    pub async fn length(&self, namespace: &str) -> Result<usize> {
        self.backend.count(namespace).await
    }
}

fn collect_entries(rows: Vec<StorageEntry>) -> Entries {
    rows.into_iter().map(|row| (row.key, row.value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn store() -> NamespaceStore {
        NamespaceStore::new(Arc::new(MemoryBackend::new()))
    }

    fn items(pairs: &[(&str, &str)]) -> Entries {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[tokio::test]
    async fn test_get_all_and_empty_namespace() {
        let store = store();
        store.set("ns", items(&[("a", "1"), ("b", "2")])).await.unwrap();

        let all = store.get_all("ns").await.unwrap().unwrap();
        assert_eq!(all, items(&[("a", "1"), ("b", "2")]));

        assert_eq!(store.get_all("empty").await.unwrap(), Some(Entries::new()));
        assert_eq!(store.get_all("").await.unwrap(), None);
        assert_eq!(store.get("", Some("a".into())).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_selected_keys() {
        let store = store();
        store.set("ns", items(&[("a", "1"), ("b", "2"), ("c", "3")])).await.unwrap();

        let one = store.get("ns", Some("a".into())).await.unwrap().unwrap();
        assert_eq!(one, items(&[("a", "1")]));

        // Absent keys are simply missing from the result
        let some = store.get("ns", Some(["b", "zzz"].into())).await.unwrap().unwrap();
        assert_eq!(some, items(&[("b", "2")]));

        // Keys of a mapping select the same keys
        let template = items(&[("a", "ignored"), ("c", "ignored")]);
        let mapped = store.get("ns", Some((&template).into())).await.unwrap().unwrap();
        assert_eq!(mapped, items(&[("a", "1"), ("c", "3")]));

        let all = store.get("ns", None).await.unwrap().unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_remove_clear_keys_length() {
        let store = store();
        store.set("ns", items(&[("a", "1"), ("b", "2"), ("c", "3")])).await.unwrap();
        store.set("other", items(&[("a", "x")])).await.unwrap();

        store.remove("ns", "a").await.unwrap();
        store.remove("ns", vec!["b", "missing"]).await.unwrap();
        assert_eq!(store.keys("ns").await.unwrap(), vec!["c".to_string()]);
        assert_eq!(store.length("ns").await.unwrap(), 1);

        store.clear("ns").await.unwrap();
        assert_eq!(store.length("ns").await.unwrap(), 0);
        assert_eq!(store.length("other").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stores_share_backend() {
        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let first = NamespaceStore::new(Arc::clone(&backend));
        let second = NamespaceStore::new(backend);

        first.set("ns", items(&[("k", "v")])).await.unwrap();
        assert_eq!(second.get_all("ns").await.unwrap().unwrap(), items(&[("k", "v")]));
    }
}
