//! # SpaceKV - Namespaced, TTL-Aware Key-Value Spaces
//!
//! SpaceKV lets callers treat one flat persistent table as many isolated
//! "spaces". Each space holds arbitrary values under string keys, with
//! optional expiration and regex key search.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              SpaceKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────────────┐     │
//! │  │   Space     │───>│ Namespace   │───>│   dyn StorageBackend     │     │
//! │  │ (TTL, regex │    │   Store     │    │  ┌────────┐ ┌─────────┐  │     │
//! │  │  search)    │    │             │    │  │ Memory │ │  redb   │  │     │
//! │  └──────┬──────┘    └─────────────┘    │  └────────┘ └─────────┘  │     │
//! │         ▲                              └──────────────────────────┘     │
//! │         │                                                               │
//! │  ┌──────┴──────────────────────────────┐                                │
//! │  │  ExpirySweeper (opt-in tokio task)  │                                │
//! │  └─────────────────────────────────────┘                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only [`Space`] knows about expiration and search. Everything below it is
//! plain namespaced CRUD.
//!
//! ## Quick Start
//!
//! ```no_run
//! use spacekv::{RedbBackend, Space};
//! use std::sync::Arc;
//!
//! # async fn demo() -> spacekv::Result<()> {
//! let backend = Arc::new(RedbBackend::open("spacekv.redb")?);
//! let sessions = Space::new(backend, "session");
//!
//! // Expires in two seconds
//! sessions.set("tok", "abc123", Some(2.0 / 86_400.0)).await?;
//! let live = sessions.get_by_strict("tok").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: the backend contract and its memory and redb implementations
//! - [`namespace`]: namespace-scoped CRUD over a backend
//! - [`space`]: expiration markers, strict reads, regex search, sweeping
//! - [`value`]: the stored value type and its byte codec
//! - [`error`]: the crate error type
//!
//! ## Lazy + Bulk Expiry
//!
//! Keys with an expiry are evicted in two ways:
//! 1. **Lazy**: a strict read of one key checks and evicts it
//! 2. **Bulk**: a sweep scans every marker of the namespace
//!
//! Plain reads never evict.

pub mod error;
pub mod namespace;
pub mod space;
pub mod storage;
pub mod value;

// Re-export commonly used types for convenience
pub use error::{Result, SpaceError};
pub use namespace::{Entries, KeyList, NamespaceStore};
pub use space::{
    Clock, ExpirySweeper, FindMode, Found, KeyArrOptions, ManualClock, Space, SpaceEntry,
    SweeperConfig, SystemClock,
};
pub use storage::{CompositeKey, MemoryBackend, RedbBackend, StorageBackend, StorageEntry};
pub use value::Value;

/// Namespace used when a space is created without one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Version of SpaceKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
