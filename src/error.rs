//! Error types for SpaceKV.
//!
//! The layer adds no error handling of its own beyond classification:
//! storage failures, codec failures and bad search patterns all propagate
//! to the caller unchanged.

use thiserror::Error;

/// Errors surfaced by spaces, namespace stores and storage backends.
#[derive(Debug, Error)]
pub enum SpaceError {
    /// The embedded database failed (I/O, corruption, full disk)
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    /// A blocking storage task panicked or was cancelled
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A stored value could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A search pattern is not a valid regular expression
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Filesystem error while preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpaceError {
    /// Wraps any of redb's specific error types.
    pub(crate) fn storage<E: Into<redb::Error>>(err: E) -> Self {
        Self::Storage(err.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SpaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_display() {
        let err: SpaceError = regex::Regex::new("key(").unwrap_err().into();
        assert!(err.to_string().starts_with("invalid pattern:"));
    }

    #[test]
    fn test_codec_error_display() {
        let err: SpaceError = serde_json::from_slice::<u8>(b"nope").unwrap_err().into();
        assert!(matches!(err, SpaceError::Codec(_)));
    }
}
