//! Durable Storage Backend on redb
//!
//! One redb table holds every namespace. Its key is the `(namespace, key)`
//! tuple, so redb's B-tree order groups each namespace into one contiguous
//! range:
//!
//! ```text
//!   ("default", "a")  ("default", "b")  ("user", "name")  ("user", "name_expire")
//!   └──── namespace "default" ────┘     └──────── namespace "user" ───────────┘
//! ```
//!
//! Values are stored as the encoded bytes of [`Value`].
//!
//! redb is a blocking API. Each call hops onto `spawn_blocking`, and each bulk
//! call is one write transaction.

use super::{CompositeKey, StorageBackend, StorageEntry};
use crate::error::{Result, SpaceError};
use crate::value::Value;
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// The single table backing every namespace.
const ENTRIES_TABLE: TableDefinition<'static, (&'static str, &'static str), &'static [u8]> =
    TableDefinition::new("entries");

/// A storage backend persisted to a redb file.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend").finish_non_exhaustive()
    }
}

impl RedbBackend {
    /// Opens or creates the database at `path`.
    ///
    /// Parent directories are created as needed and the entries table is
    /// initialised so that read transactions always find it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(path).map_err(SpaceError::storage)?;

        let write_txn = db.begin_write().map_err(SpaceError::storage)?;
        {
            let _table = write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(SpaceError::storage)?;
        }
        write_txn.commit().map_err(SpaceError::storage)?;

        debug!(path = %path.display(), "opened redb backend");
        Ok(Self { db: Arc::new(db) })
    }

    /// Runs a blocking closure against the database on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

/// Collects every row of `namespace` from a readable table.
fn scan_namespace<T>(table: &T, namespace: &str) -> Result<Vec<StorageEntry>>
where
    T: ReadableTable<(&'static str, &'static str), &'static [u8]>,
{
    let mut entries = Vec::new();

    for item in table.range((namespace, "")..).map_err(SpaceError::storage)? {
        let (key, value) = item.map_err(SpaceError::storage)?;
        let (ns, k) = key.value();
        if ns != namespace {
            break;
        }
        entries.push(StorageEntry::new(ns, k, Value::decode(value.value())?));
    }

    Ok(entries)
}

/// Collects the keys (not values) of every row in `namespace`.
fn scan_keys<T>(table: &T, namespace: &str) -> Result<Vec<String>>
where
    T: ReadableTable<(&'static str, &'static str), &'static [u8]>,
{
    let mut keys = Vec::new();

    for item in table.range((namespace, "")..).map_err(SpaceError::storage)? {
        let (key, _) = item.map_err(SpaceError::storage)?;
        let (ns, k) = key.value();
        if ns != namespace {
            break;
        }
        keys.push(k.to_string());
    }

    Ok(keys)
}

#[async_trait]
impl StorageBackend for RedbBackend {
    async fn bulk_get(&self, keys: &[CompositeKey]) -> Result<Vec<StorageEntry>> {
        let keys = keys.to_vec();

        self.blocking(move |db| {
            let read_txn = db.begin_read().map_err(SpaceError::storage)?;
            let table = read_txn.open_table(ENTRIES_TABLE).map_err(SpaceError::storage)?;

            let mut entries = Vec::with_capacity(keys.len());
            for ck in keys {
                let found = table
                    .get((ck.namespace.as_str(), ck.key.as_str()))
                    .map_err(SpaceError::storage)?;
                if let Some(guard) = found {
                    let value = Value::decode(guard.value())?;
                    entries.push(StorageEntry::new(ck.namespace, ck.key, value));
                }
            }
            Ok(entries)
        })
        .await
    }

    async fn where_namespace(&self, namespace: &str) -> Result<Vec<StorageEntry>> {
        let namespace = namespace.to_string();

        self.blocking(move |db| {
            let read_txn = db.begin_read().map_err(SpaceError::storage)?;
            let table = read_txn.open_table(ENTRIES_TABLE).map_err(SpaceError::storage)?;
            scan_namespace(&table, &namespace)
        })
        .await
    }

    async fn where_key(&self, key: &str) -> Result<Vec<StorageEntry>> {
        let key = key.to_string();

        // No secondary index on key: full scan
        self.blocking(move |db| {
            let read_txn = db.begin_read().map_err(SpaceError::storage)?;
            let table = read_txn.open_table(ENTRIES_TABLE).map_err(SpaceError::storage)?;

            let mut entries = Vec::new();
            for item in table.iter().map_err(SpaceError::storage)? {
                let (k, value) = item.map_err(SpaceError::storage)?;
                let (ns, row_key) = k.value();
                if row_key == key {
                    entries.push(StorageEntry::new(ns, row_key, Value::decode(value.value())?));
                }
            }
            Ok(entries)
        })
        .await
    }

    async fn primary_keys(&self, namespace: &str) -> Result<Vec<CompositeKey>> {
        let namespace = namespace.to_string();

        self.blocking(move |db| {
            let read_txn = db.begin_read().map_err(SpaceError::storage)?;
            let table = read_txn.open_table(ENTRIES_TABLE).map_err(SpaceError::storage)?;
            let keys = scan_keys(&table, &namespace)?;
            Ok(keys
                .into_iter()
                .map(|key| CompositeKey::new(namespace.clone(), key))
                .collect())
        })
        .await
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let namespace = namespace.to_string();

        self.blocking(move |db| {
            let read_txn = db.begin_read().map_err(SpaceError::storage)?;
            let table = read_txn.open_table(ENTRIES_TABLE).map_err(SpaceError::storage)?;
            Ok(scan_keys(&table, &namespace)?.len())
        })
        .await
    }

    async fn bulk_put(&self, entries: Vec<StorageEntry>) -> Result<()> {
        // Encode up front so a codec failure never leaves a half-written batch
        let encoded = entries
            .into_iter()
            .map(|entry| Ok((entry.namespace, entry.key, entry.value.encode()?)))
            .collect::<Result<Vec<_>>>()?;

        self.blocking(move |db| {
            let write_txn = db.begin_write().map_err(SpaceError::storage)?;
            {
                let mut table = write_txn.open_table(ENTRIES_TABLE).map_err(SpaceError::storage)?;
                for (namespace, key, bytes) in &encoded {
                    table
                        .insert((namespace.as_str(), key.as_str()), &bytes[..])
                        .map_err(SpaceError::storage)?;
                }
            }
            write_txn.commit().map_err(SpaceError::storage)?;

            trace!(rows = encoded.len(), "redb bulk put");
            Ok(())
        })
        .await
    }

    async fn bulk_delete(&self, keys: Vec<CompositeKey>) -> Result<()> {
        self.blocking(move |db| {
            let write_txn = db.begin_write().map_err(SpaceError::storage)?;
            {
                let mut table = write_txn.open_table(ENTRIES_TABLE).map_err(SpaceError::storage)?;
                for ck in &keys {
                    table
                        .remove((ck.namespace.as_str(), ck.key.as_str()))
                        .map_err(SpaceError::storage)?;
                }
            }
            write_txn.commit().map_err(SpaceError::storage)?;

            trace!(rows = keys.len(), "redb bulk delete");
            Ok(())
        })
        .await
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<usize> {
        let namespace = namespace.to_string();

        self.blocking(move |db| {
            let write_txn = db.begin_write().map_err(SpaceError::storage)?;
            let removed = {
                let mut table = write_txn.open_table(ENTRIES_TABLE).map_err(SpaceError::storage)?;

                // Collect first; the range borrows the table
                let keys = scan_keys(&table, &namespace)?;
                for key in &keys {
                    table
                        .remove((namespace.as_str(), key.as_str()))
                        .map_err(SpaceError::storage)?;
                }
                keys.len()
            };
            write_txn.commit().map_err(SpaceError::storage)?;

            debug!(namespace = %namespace, removed, "cleared namespace");
            Ok(removed)
        })
        .await
    }
}
