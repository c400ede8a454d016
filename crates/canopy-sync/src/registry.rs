//! The refresher registry.

use crate::refresher::{CacheRefresher, RefresherId};
use crate::{SyncError, SyncResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Maps refresher ids to their handlers.
///
/// Built once while the process starts, before any invalidation traffic
/// is possible, then shared immutably (typically behind an `Arc`). The
/// write-once-read-many lifecycle is why lookups need no locking.
#[derive(Default)]
pub struct RefresherRegistry {
    handlers: HashMap<RefresherId, Arc<dyn CacheRefresher>>,
}

impl RefresherRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its own id.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DuplicateRefresher`] if the id is already
    /// bound. This aborts initialization; two handlers behind one id
    /// would make fan-out ambiguous on every server.
    pub fn register(&mut self, handler: Arc<dyn CacheRefresher>) -> SyncResult<()> {
        let id = handler.id();
        if self.handlers.contains_key(&id) {
            return Err(SyncError::DuplicateRefresher(id));
        }
        debug!(refresher = handler.name(), %id, "registered cache refresher");
        self.handlers.insert(id, handler);
        Ok(())
    }

    /// Resolves a handler by id.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownRefresher`] if no handler is bound.
    pub fn resolve(&self, id: RefresherId) -> SyncResult<Arc<dyn CacheRefresher>> {
        self.handlers
            .get(&id)
            .cloned()
            .ok_or(SyncError::UnknownRefresher(id))
    }

    /// Returns the number of registered refreshers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no refresher is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
