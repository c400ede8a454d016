//! Error types for the snapshot store.

use thiserror::Error;

/// Errors raised by the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The upstream persistence provider failed.
    #[error("tree source error: {0}")]
    Source(String),

    /// A serialized node row could not be decoded.
    #[error("node row error: {0}")]
    Row(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a source error.
    #[must_use]
    pub fn source(detail: impl Into<String>) -> Self {
        Self::Source(detail.into())
    }
}

/// A specialized `Result` for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
