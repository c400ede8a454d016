//! Error types for cache invalidation.

use crate::refresher::RefresherId;
use thiserror::Error;

/// Errors raised by the invalidation layer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A call site used a refresher id that was never registered.
    #[error("not a registered cache refresher id: {0}")]
    UnknownRefresher(RefresherId),

    /// A refresher id was registered twice during startup.
    #[error("cache refresher id registered twice: {0}")]
    DuplicateRefresher(RefresherId),

    /// A refresher could not parse its JSON payload.
    #[error("malformed payload for refresher '{refresher}': {detail}")]
    MalformedPayload {
        /// Name of the refresher that rejected the payload.
        refresher: String,
        /// What was wrong with it.
        detail: String,
    },

    /// The messenger collaborator failed to deliver to one or more peers.
    ///
    /// Never fatal to the originating process; the gateway logs this and
    /// carries on, leaving the missed peers stale until the next rebuild.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl SyncError {
    /// Creates a malformed-payload error.
    #[must_use]
    pub fn malformed(refresher: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedPayload {
            refresher: refresher.into(),
            detail: detail.into(),
        }
    }
}

/// A specialized `Result` for invalidation operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
