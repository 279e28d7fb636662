//! Expiration Markers
//!
//! A space stores an optional expiry for key `K` as a sibling row:
//!
//! ```text
//!   "tok"         -> "abc123"
//!   "tok_expire"  -> 1717171717000     (epoch milliseconds)
//! ```
//!
//! [`SpaceEntry`] is the typed form of that convention. It is lowered to one
//! or two physical rows by [`SpaceEntry::into_rows`], so both rows always
//! travel in the same bulk upsert.
//!
//! A value is expired at its expiry instant, not only after it:
//! `now >= expires_at`.

use crate::namespace::Entries;
use crate::value::Value;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Suffix that turns an owning key into its marker key.
pub const EXPIRE_SUFFIX: &str = "_expire";

/// Milliseconds in one day; expiry durations are given in days.
pub const MS_PER_DAY: f64 = 86_400_000.0;

lazy_static! {
    /// Matches marker keys.
    pub(crate) static ref MARKER_PATTERN: Regex =
        Regex::new(&format!("{}$", regex::escape(EXPIRE_SUFFIX))).unwrap();
}

/// The marker key for `key`.
pub fn marker_key(key: &str) -> String {
    format!("{key}{EXPIRE_SUFFIX}")
}

/// The owning key of a marker key, or `None` if `key` is not a marker.
pub fn owner_key(key: &str) -> Option<&str> {
    key.strip_suffix(EXPIRE_SUFFIX)
}

/// Whether an expiry timestamp has been reached.
#[inline]
pub fn is_expired(expires_at: i64, now: i64) -> bool {
    now >= expires_at
}

/// Converts a duration in days into an absolute expiry instant.
///
/// Only finite, positive durations produce an expiry. Durations past the
/// representable range saturate at `i64::MAX`.
pub fn expiry_from_days(now: i64, expire_days: Option<f64>) -> Option<i64> {
    match expire_days {
        Some(days) if days.is_finite() && days > 0.0 => {
            Some(now.saturating_add((days * MS_PER_DAY) as i64))
        }
        _ => None,
    }
}

/// A logical entry of a space, before it is split into rows.
#[derive(Debug, Clone, PartialEq)]
pub enum SpaceEntry {
    /// A value with no expiry row written
    Plain { key: String, value: Value },
    /// A value plus its marker row
    Expiring {
        key: String,
        value: Value,
        expires_at: i64,
    },
}

impl SpaceEntry {
    /// Builds the entry for a `set` issued at `now`.
    pub fn new(key: impl Into<String>, value: Value, expire_days: Option<f64>, now: i64) -> Self {
        let key = key.into();
        match expiry_from_days(now, expire_days) {
            Some(expires_at) => Self::Expiring {
                key,
                value,
                expires_at,
            },
            None => Self::Plain { key, value },
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Plain { key, .. } | Self::Expiring { key, .. } => key,
        }
    }

    pub fn expires_at(&self) -> Option<i64> {
        match self {
            Self::Plain { .. } => None,
            Self::Expiring { expires_at, .. } => Some(*expires_at),
        }
    }

    /// Lowers the entry into its physical rows.
    pub fn into_rows(self) -> Entries {
        let mut rows = Entries::new();
        match self {
            Self::Plain { key, value } => {
                rows.insert(key, value);
            }
            Self::Expiring {
                key,
                value,
                expires_at,
            } => {
                rows.insert(marker_key(&key), Value::from(expires_at));
                rows.insert(key, value);
            }
        }
        rows
    }
}

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            // Before the epoch: treat as the epoch itself
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now)),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_naming() {
        assert_eq!(marker_key("tok"), "tok_expire");
        assert_eq!(owner_key("tok_expire"), Some("tok"));
        assert_eq!(owner_key("tok"), None);
        // Only the suffix is stripped
        assert_eq!(owner_key("a_expire_b_expire"), Some("a_expire_b"));

        assert!(MARKER_PATTERN.is_match("tok_expire"));
        assert!(!MARKER_PATTERN.is_match("tok_expired"));
        assert!(!MARKER_PATTERN.is_match("tok"));
    }

    #[test]
    fn test_expiry_from_days() {
        assert_eq!(expiry_from_days(1_000, Some(1.0)), Some(1_000 + 86_400_000));
        assert_eq!(expiry_from_days(0, Some(2.0 / 86_400.0)), Some(2_000));
        assert_eq!(expiry_from_days(1_000, None), None);
        assert_eq!(expiry_from_days(1_000, Some(0.0)), None);
        assert_eq!(expiry_from_days(1_000, Some(-3.0)), None);
        assert_eq!(expiry_from_days(1_000, Some(f64::NAN)), None);
        assert_eq!(expiry_from_days(1_000, Some(1e300)), Some(i64::MAX));
        assert_eq!(expiry_from_days(i64::MAX - 1, Some(1.0)), Some(i64::MAX));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        assert!(!is_expired(100, 99));
        assert!(is_expired(100, 100));
        assert!(is_expired(100, 101));
    }

    #[test]
    fn test_entry_rows() {
        let plain = SpaceEntry::new("name", Value::from("v"), None, 0);
        assert_eq!(plain.expires_at(), None);
        let rows = plain.into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows["name"], Value::from("v"));

        let expiring = SpaceEntry::new("tok", Value::from("abc123"), Some(1.0), 5);
        assert_eq!(expiring.key(), "tok");
        assert_eq!(expiring.expires_at(), Some(5 + 86_400_000));
        let rows = expiring.into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows["tok_expire"].as_timestamp(), Some(5 + 86_400_000));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10);
        let shared = clock.clone();
        clock.advance(5);
        assert_eq!(shared.now_millis(), 15);
        shared.set(100);
        assert_eq!(clock.now_millis(), 100);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
