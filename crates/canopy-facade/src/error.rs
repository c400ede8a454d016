//! Error types for the facade layer.

use thiserror::Error;

/// Errors raised by facade and preview operations.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// A snapshot store operation failed.
    #[error(transparent)]
    Store(#[from] canopy_store::StoreError),

    /// An invalidation-layer operation failed.
    #[error(transparent)]
    Sync(#[from] canopy_sync::SyncError),
}

/// A specialized `Result` for facade operations.
pub type FacadeResult<T> = std::result::Result<T, FacadeError>;
