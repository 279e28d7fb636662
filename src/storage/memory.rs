//! In-Memory Storage Backend
//!
//! A process-local table partitioned by namespace. Each namespace owns its
//! own ordered map, so namespace scans, counts and clears never look at rows
//! of other namespaces.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MemoryBackend                           │
//! │              tokio::sync::RwLock<Partitions>                │
//! │  ┌───────────┐ ┌───────────┐ ┌───────────┐                  │
//! │  │ "default" │ │  "user"   │ │   "hi"    │  ...             │
//! │  │ BTreeMap  │ │ BTreeMap  │ │ BTreeMap  │                  │
//! │  └───────────┘ └───────────┘ └───────────┘                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every bulk call runs under a single write lock, so a value and its
//! expiration marker are always written or deleted together.

use super::{CompositeKey, StorageBackend, StorageEntry};
use crate::error::Result;
use crate::value::Value;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::trace;

type Partitions = BTreeMap<String, BTreeMap<String, Value>>;

/// A storage backend that lives entirely in memory.
pub struct MemoryBackend {
    partitions: RwLock<Partitions>,

    /// Statistics: rows read by lookups and scans
    read_count: AtomicU64,

    /// Statistics: rows written by bulk puts
    write_count: AtomicU64,

    /// Statistics: rows removed by deletes
    delete_count: AtomicU64,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("read_count", &self.read_count.load(Ordering::Relaxed))
            .field("write_count", &self.write_count.load(Ordering::Relaxed))
            .field("delete_count", &self.delete_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(BTreeMap::new()),
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            delete_count: AtomicU64::new(0),
        }
    }

    /// Returns operation statistics.
    pub fn stats(&self) -> BackendStats {
        BackendStats {
            rows_read: self.read_count.load(Ordering::Relaxed),
            rows_written: self.write_count.load(Ordering::Relaxed),
            rows_deleted: self.delete_count.load(Ordering::Relaxed),
        }
    }

    fn record_reads(&self, rows: usize) {
        self.read_count.fetch_add(rows as u64, Ordering::Relaxed);
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn bulk_get(&self, keys: &[CompositeKey]) -> Result<Vec<StorageEntry>> {
        let partitions = self.partitions.read().await;

        let entries: Vec<StorageEntry> = keys
            .iter()
            .filter_map(|ck| {
                partitions
                    .get(&ck.namespace)
                    .and_then(|rows| rows.get(&ck.key))
                    .map(|value| {
                        StorageEntry::new(ck.namespace.clone(), ck.key.clone(), value.clone())
                    })
            })
            .collect();

        self.record_reads(entries.len());
        Ok(entries)
    }

    async fn where_namespace(&self, namespace: &str) -> Result<Vec<StorageEntry>> {
        let partitions = self.partitions.read().await;

        let entries: Vec<StorageEntry> = partitions
            .get(namespace)
            .map(|rows| {
                rows.iter()
                    .map(|(key, value)| StorageEntry::new(namespace, key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        self.record_reads(entries.len());
        Ok(entries)
    }

    async fn where_key(&self, key: &str) -> Result<Vec<StorageEntry>> {
        let partitions = self.partitions.read().await;

        let entries: Vec<StorageEntry> = partitions
            .iter()
            .filter_map(|(namespace, rows)| {
                rows.get(key)
                    .map(|value| StorageEntry::new(namespace.clone(), key, value.clone()))
            })
            .collect();

        self.record_reads(entries.len());
        Ok(entries)
    }

    async fn primary_keys(&self, namespace: &str) -> Result<Vec<CompositeKey>> {
        let partitions = self.partitions.read().await;

        Ok(partitions
            .get(namespace)
            .map(|rows| {
                rows.keys()
                    .map(|key| CompositeKey::new(namespace, key.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let partitions = self.partitions.read().await;
        Ok(partitions.get(namespace).map(BTreeMap::len).unwrap_or(0))
    }

    async fn bulk_put(&self, entries: Vec<StorageEntry>) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        let written = entries.len();

        for entry in entries {
            partitions
                .entry(entry.namespace)
                .or_default()
                .insert(entry.key, entry.value);
        }

        self.write_count.fetch_add(written as u64, Ordering::Relaxed);
        trace!(rows = written, "memory bulk put");
        Ok(())
    }

    async fn bulk_delete(&self, keys: Vec<CompositeKey>) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        let mut deleted = 0u64;

        for ck in keys {
            if let Some(rows) = partitions.get_mut(&ck.namespace) {
                if rows.remove(&ck.key).is_some() {
                    deleted += 1;
                }
                // Drop empty partitions
                if rows.is_empty() {
                    partitions.remove(&ck.namespace);
                }
            }
        }

        self.delete_count.fetch_add(deleted, Ordering::Relaxed);
        trace!(rows = deleted, "memory bulk delete");
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<usize> {
        let mut partitions = self.partitions.write().await;
        let removed = partitions.remove(namespace).map(|rows| rows.len()).unwrap_or(0);

        self.delete_count.fetch_add(removed as u64, Ordering::Relaxed);
        Ok(removed)
    }
}

/// Backend statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStats {
    /// Rows returned by lookups and scans
    pub rows_read: u64,
    /// Rows written by bulk puts
    pub rows_written: u64,
    /// Rows actually removed by deletes
    pub rows_deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(namespace: &str, key: &str, value: &str) -> StorageEntry {
        StorageEntry::new(namespace, key, Value::from(value))
    }

    #[tokio::test]
    async fn test_put_and_scan_namespace() {
        let backend = MemoryBackend::new();

        backend
            .bulk_put(vec![
                entry("a", "k1", "v1"),
                entry("a", "k2", "v2"),
                entry("b", "k1", "other"),
            ])
            .await
            .unwrap();

        let rows = backend.where_namespace("a").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.namespace == "a"));

        assert_eq!(backend.count("a").await.unwrap(), 2);
        assert_eq!(backend.count("b").await.unwrap(), 1);
        assert_eq!(backend.count("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bulk_get_skips_absent() {
        let backend = MemoryBackend::new();
        backend.bulk_put(vec![entry("a", "k1", "v1")]).await.unwrap();

        let rows = backend
            .bulk_get(&[CompositeKey::new("a", "k1"), CompositeKey::new("a", "nope")])
            .await
            .unwrap();

        assert_eq!(rows, vec![entry("a", "k1", "v1")]);
    }

    #[tokio::test]
    async fn test_where_key_crosses_namespaces() {
        let backend = MemoryBackend::new();
        backend
            .bulk_put(vec![
                entry("a", "shared", "1"),
                entry("b", "shared", "2"),
                entry("b", "solo", "3"),
            ])
            .await
            .unwrap();

        let rows = backend.where_key("shared").await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_overwrite_and_delete() {
        let backend = MemoryBackend::new();

        backend.bulk_put(vec![entry("a", "k", "old")]).await.unwrap();
        backend.bulk_put(vec![entry("a", "k", "new")]).await.unwrap();
        assert_eq!(backend.count("a").await.unwrap(), 1);

        let rows = backend.bulk_get(&[CompositeKey::new("a", "k")]).await.unwrap();
        assert_eq!(rows[0].value, Value::from("new"));

        // Absent keys are ignored
        backend
            .bulk_delete(vec![CompositeKey::new("a", "k"), CompositeKey::new("a", "ghost")])
            .await
            .unwrap();
        assert_eq!(backend.count("a").await.unwrap(), 0);
        assert_eq!(backend.stats().rows_deleted, 1);
    }

    #[tokio::test]
    async fn test_delete_namespace() {
        let backend = MemoryBackend::new();
        backend
            .bulk_put(vec![entry("a", "k1", "v"), entry("a", "k2", "v"), entry("b", "k1", "v")])
            .await
            .unwrap();

        assert_eq!(backend.delete_namespace("a").await.unwrap(), 2);
        assert_eq!(backend.count("a").await.unwrap(), 0);
        assert_eq!(backend.count("b").await.unwrap(), 1);
        assert_eq!(backend.delete_namespace("a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_primary_keys_in_order() {
        let backend = MemoryBackend::new();
        backend
            .bulk_put(vec![entry("a", "b", "v"), entry("a", "a", "v"), entry("z", "c", "v")])
            .await
            .unwrap();

        let keys = backend.primary_keys("a").await.unwrap();
        assert_eq!(keys, vec![CompositeKey::new("a", "a"), CompositeKey::new("a", "b")]);
    }
}
