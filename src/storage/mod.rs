//! Storage Backends
//!
//! Everything above this module sees storage as one flat table of
//! [`StorageEntry`] rows keyed by `(namespace, key)`. This module defines that
//! contract ([`StorageBackend`]) and ships two implementations of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  dyn StorageBackend                         │
//! │                                                             │
//! │   primary index:   (namespace, key)  ──>  Value             │
//! │   secondary scans: namespace = N  |  key = K                │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!       ┌────────┴────────┐            ┌────────┴────────┐
//!       │ MemoryBackend   │            │ RedbBackend     │
//!       │ (per-namespace  │            │ (one redb table,│
//!       │  BTreeMaps)     │            │  tuple keys)    │
//!       └─────────────────┘            └─────────────────┘
//! ```
//!
//! ## Contract
//!
//! - Bulk calls (`bulk_put`, `bulk_delete`) are applied as one batch.
//! - Deleting an absent key is not an error.
//! - Failures are returned as-is; backends never retry.

pub mod disk;
pub mod memory;

pub use disk::RedbBackend;
pub use memory::{BackendStats, MemoryBackend};

use crate::error::Result;
use crate::value::Value;
use async_trait::async_trait;

/// Primary identity of a row: `(namespace, key)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey {
    pub namespace: String,
    pub key: String,
}

impl CompositeKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

/// One physical row of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEntry {
    pub namespace: String,
    pub key: String,
    pub value: Value,
}

impl StorageEntry {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value,
        }
    }

    /// The composite primary key of this row.
    pub fn composite_key(&self) -> CompositeKey {
        CompositeKey::new(self.namespace.clone(), self.key.clone())
    }
}

/// The table a namespace store persists into.
///
/// Implementations must be shareable across tasks; several namespace stores
/// usually hold the same `Arc<dyn StorageBackend>`.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Point lookup of several composite keys. Absent keys are skipped.
    async fn bulk_get(&self, keys: &[CompositeKey]) -> Result<Vec<StorageEntry>>;

    /// Every row whose namespace equals `namespace`.
    async fn where_namespace(&self, namespace: &str) -> Result<Vec<StorageEntry>>;

    /// Every row whose key equals `key`, across all namespaces.
    async fn where_key(&self, key: &str) -> Result<Vec<StorageEntry>>;

    /// Primary keys of every row in `namespace`, in index order.
    async fn primary_keys(&self, namespace: &str) -> Result<Vec<CompositeKey>>;

    /// Number of rows in `namespace`.
    async fn count(&self, namespace: &str) -> Result<usize>;

    /// Inserts or overwrites every entry in one batch.
    async fn bulk_put(&self, entries: Vec<StorageEntry>) -> Result<()>;

    /// Deletes every listed key in one batch. Absent keys are ignored.
    async fn bulk_delete(&self, keys: Vec<CompositeKey>) -> Result<()>;

    /// Deletes every row in `namespace`, returning how many were removed.
    async fn delete_namespace(&self, namespace: &str) -> Result<usize>;
}
