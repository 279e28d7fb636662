//! Spaces: TTL-Aware Namespaces
//!
//! A [`Space`] presents one namespace as an ergonomic key-value store. It is
//! built entirely from [`NamespaceStore`] primitives and layers three
//! conventions on top:
//!
//! 1. **Expiration markers**: `set` with a positive duration also writes
//!    `key_expire` (see [`expiry`]).
//! 2. **Strict reads**: [`Space::get_by_strict`] evicts a key whose marker has
//!    been reached. Plain [`Space::get`] never evicts.
//! 3. **Regex search**: [`Space::find_by_reg`] and the removal and sweep
//!    operations built on it (see [`search`]).
//!
//! ## Lazy + Bulk Expiry
//!
//! ```text
//!   get_by_strict("tok")      one key: load key + marker, evict if due
//!   clean_all_expire_data()   every marker in the namespace, evict all due
//! ```
//!
//! Nothing else expires data. An [`ExpirySweeper`] only schedules
//! `clean_all_expire_data` in the background.
//!
//! ## Quirk: plain `set` keeps an old expiry
//!
//! `set(key, value, None)` writes only the value row. A marker left by an
//! earlier `set(key, _, Some(days))` stays in force.
//!
//! ## Example
//!
//! ```
//! use spacekv::{MemoryBackend, Space};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let backend = Arc::new(MemoryBackend::new());
//! let users = Space::new(backend, "user");
//!
//! users.set("name", "张三", None).await?;
//! assert_eq!(users.get("name").await?.unwrap().as_str(), Some("张三"));
//!
//! users.set("token", "abc123", Some(1.0)).await?;
//! assert!(users.get_by_strict("token").await?.is_some());
//! # Ok::<_, spacekv::SpaceError>(())
//! # }).unwrap();
//! ```

pub mod expiry;
pub mod search;
pub mod sweeper;

pub use expiry::{Clock, ManualClock, SpaceEntry, SystemClock, EXPIRE_SUFFIX};
pub use search::{FindMode, Found, IntoPattern};
pub use sweeper::{ExpirySweeper, SweeperConfig};

use crate::error::Result;
use crate::namespace::{Entries, NamespaceStore};
use crate::storage::StorageBackend;
use crate::value::Value;
use crate::DEFAULT_NAMESPACE;
use expiry::{is_expired, marker_key, owner_key, MARKER_PATTERN};
use std::sync::Arc;
use tracing::{debug, trace};

/// Options for [`Space::set_by_key_arr`].
#[derive(Debug, Clone)]
pub struct KeyArrOptions {
    /// Expiry in days; `None` or non-positive writes no marker
    pub expire_days: Option<f64>,
    /// Separator placed between key parts (default `"_"`)
    pub join_str: String,
    /// Drop empty parts before joining (default `true`)
    pub filter: bool,
}

impl Default for KeyArrOptions {
    fn default() -> Self {
        Self {
            expire_days: None,
            join_str: "_".to_string(),
            filter: true,
        }
    }
}

/// Joins key parts into one storage key.
pub fn join_key<S: AsRef<str>>(parts: &[S], join_str: &str, filter: bool) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .filter(|part| !filter || !part.is_empty())
        .collect::<Vec<_>>()
        .join(join_str)
}

/// One namespace of a shared backend, with expiry and search.
#[derive(Clone)]
pub struct Space {
    namespace: String,
    store: NamespaceStore,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Space")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl Space {
    /// Creates a space over `backend`. An empty namespace becomes `"default"`.
    pub fn new(backend: Arc<dyn StorageBackend>, namespace: impl Into<String>) -> Self {
        Self::with_clock(backend, namespace, Arc::new(SystemClock))
    }

    /// Creates a space that reads time from `clock`.
    pub fn with_clock(
        backend: Arc<dyn StorageBackend>,
        namespace: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut namespace = namespace.into();
        if namespace.is_empty() {
            namespace = DEFAULT_NAMESPACE.to_string();
        }

        Self {
            namespace,
            store: NamespaceStore::new(backend),
            clock,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Loads `key` and its marker in one lookup.
    async fn load_with_marker(&self, key: &str) -> Result<(Option<Value>, Option<Value>)> {
        let marker = marker_key(key);
        let mut rows = self
            .store
            .get(&self.namespace, Some(vec![key.to_string(), marker.clone()].into()))
            .await?
            .unwrap_or_default();

        Ok((rows.remove(key), rows.remove(&marker)))
    }

    /// All keys of the namespace, markers included.
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.store.keys(&self.namespace).await
    }

    /// Number of rows in the namespace, markers included.
    pub async fn length(&self) -> Result<usize> {
        self.store.length(&self.namespace).await
    }

    /// Upserts `key → value`, plus a marker when `expire_days` is positive.
    ///
    /// Without a positive duration an existing marker is left untouched.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Value>,
        expire_days: Option<f64>,
    ) -> Result<()> {
        let entry = SpaceEntry::new(key, value.into(), expire_days, self.now());
        if let Some(expires_at) = entry.expires_at() {
            trace!(namespace = %self.namespace, key, expires_at, "set with expiry");
        }
        self.store.set(&self.namespace, entry.into_rows()).await
    }

    /// Joins `parts` into a key per `opt` and sets it.
    pub async fn set_by_key_arr<S: AsRef<str>>(
        &self,
        parts: &[S],
        value: impl Into<Value>,
        opt: KeyArrOptions,
    ) -> Result<()> {
        let key = join_key(parts, &opt.join_str, opt.filter);
        self.set(&key, value, opt.expire_days).await
    }

    /// The whole namespace, markers included. Never evicts.
    pub async fn get_all(&self) -> Result<Entries> {
        Ok(self.store.get_all(&self.namespace).await?.unwrap_or_default())
    }

    /// Current value of `key`, ignoring expiry. Never evicts.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let (value, _marker) = self.load_with_marker(key).await?;
        Ok(value)
    }

    /// Sweeps every expired key, then returns the whole namespace.
    pub async fn get_all_by_strict(&self) -> Result<Entries> {
        self.clean_all_expire_data().await?;
        self.get_all().await
    }

    /// Value of `key` unless its marker has been reached.
    ///
    /// An expired key is removed together with its marker.
    pub async fn get_by_strict(&self, key: &str) -> Result<Option<Value>> {
        let (value, marker) = self.load_with_marker(key).await?;

        if let Some(expires_at) = marker.as_ref().and_then(Value::as_timestamp) {
            if is_expired(expires_at, self.now()) {
                debug!(namespace = %self.namespace, key, expires_at, "evicting expired key");
                self.remove(key).await?;
                return Ok(None);
            }
        }

        Ok(value)
    }

    /// Rows whose key matches `pattern`, markers included.
    async fn matching<'p>(&self, pattern: impl IntoPattern<'p>) -> Result<Entries> {
        let pattern = pattern.into_pattern()?;
        let data = self.get_all().await?;
        Ok(search::matching(data, &pattern))
    }

    /// Searches the namespace (markers included) for keys matching `pattern`.
    pub async fn find_by_reg<'p>(
        &self,
        pattern: impl IntoPattern<'p>,
        mode: FindMode,
    ) -> Result<Found> {
        Ok(Found::shape(self.matching(pattern).await?, mode))
    }

    /// Matching keys.
    pub async fn find_keys<'p>(&self, pattern: impl IntoPattern<'p>) -> Result<Vec<String>> {
        Ok(self.matching(pattern).await?.into_keys().collect())
    }

    /// Values of matching keys, in the same order as [`Space::find_keys`].
    pub async fn find_values<'p>(&self, pattern: impl IntoPattern<'p>) -> Result<Vec<Value>> {
        Ok(self.matching(pattern).await?.into_values().collect())
    }

    /// Matching key → value pairs.
    pub async fn find_entries<'p>(&self, pattern: impl IntoPattern<'p>) -> Result<Entries> {
        self.matching(pattern).await
    }

    /// Value of the first matching key.
    pub async fn find_one<'p>(&self, pattern: impl IntoPattern<'p>) -> Result<Option<Value>> {
        Ok(self.matching(pattern).await?.into_values().next())
    }

    /// Deletes `key` and its marker.
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.store
            .remove(&self.namespace, vec![key.to_string(), marker_key(key)])
            .await
    }

    /// Deletes every key and its marker in one batch. Empty input is a no-op.
    pub async fn remove_by_keys<S: AsRef<str>>(&self, keys: &[S]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let doomed: Vec<String> = keys
            .iter()
            .flat_map(|key| {
                let key = key.as_ref();
                [key.to_string(), marker_key(key)]
            })
            .collect();

        self.store.remove(&self.namespace, doomed).await
    }

    /// Deletes every row of the namespace, markers included.
    pub async fn remove_all(&self) -> Result<()> {
        self.store.clear(&self.namespace).await
    }

    /// Deletes every key matching `pattern`, with its marker.
    ///
    /// Returns the number of matched keys.
    pub async fn remove_by_reg<'p>(&self, pattern: impl IntoPattern<'p>) -> Result<usize> {
        let keys = self.find_keys(pattern).await?;
        self.remove_by_keys(&keys).await?;
        Ok(keys.len())
    }

    /// Evicts every key whose marker has been reached.
    ///
    /// Returns the number of evicted keys.
    pub async fn clean_all_expire_data(&self) -> Result<usize> {
        let markers = self.find_entries(&*MARKER_PATTERN).await?;
        let now = self.now();

        let due: Vec<&str> = markers
            .iter()
            .filter(|(_, stamp)| stamp.as_timestamp().is_some_and(|at| is_expired(at, now)))
            .filter_map(|(marker, _)| owner_key(marker))
            .collect();

        self.remove_by_keys(&due).await?;

        if !due.is_empty() {
            debug!(namespace = %self.namespace, evicted = due.len(), "swept expired keys");
        }
        Ok(due.len())
    }
}
