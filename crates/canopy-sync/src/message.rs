//! Invalidation messages fanned out across the farm.

use crate::refresher::{CacheRefresher, RefresherId};
use crate::SyncResult;
use canopy_core::{NodeId, NodeKey, ServerAddress};
use serde::{Deserialize, Serialize};

/// The shape of an invalidation, mirroring the refresher contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    /// Invalidate everything the refresher covers.
    RefreshAll,
    /// Invalidate one entity by numeric id.
    RefreshById {
        /// The affected id.
        id: NodeId,
    },
    /// Invalidate a batch of entities by numeric id in one message.
    RefreshByIds {
        /// The affected ids.
        ids: Vec<NodeId>,
    },
    /// Invalidate one entity by GUID.
    RefreshByKey {
        /// The affected key.
        key: NodeKey,
    },
    /// Apply an opaque JSON payload understood by the refresher.
    RefreshByPayload {
        /// The raw JSON.
        payload: String,
    },
    /// Remove one entity by numeric id.
    RemoveById {
        /// The removed id.
        id: NodeId,
    },
    /// Remove a batch of entities by numeric id in one message.
    RemoveByIds {
        /// The removed ids.
        ids: Vec<NodeId>,
    },
}

/// One invalidation notification.
///
/// Transient: never persisted, consumed once by each peer. A peer that
/// misses a message is stale until the next full rebuild catches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationMessage {
    /// The refresher that must handle this message on each peer.
    pub refresher: RefresherId,
    /// What to invalidate.
    pub kind: MessageKind,
    /// The server the edit originated on.
    pub origin: ServerAddress,
}

impl InvalidationMessage {
    /// Creates a new message.
    #[must_use]
    pub fn new(refresher: RefresherId, kind: MessageKind, origin: ServerAddress) -> Self {
        Self {
            refresher,
            kind,
            origin,
        }
    }

    /// Dispatches this message to a resolved handler.
    ///
    /// This is what messengers call on the receiving side once the
    /// refresher id has been resolved against the local registry.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::SyncError::MalformedPayload`] from
    /// payload-shaped messages; all other shapes are infallible.
    pub fn apply_to(&self, handler: &dyn CacheRefresher) -> SyncResult<()> {
        match &self.kind {
            MessageKind::RefreshAll => {
                handler.refresh_all();
                Ok(())
            }
            MessageKind::RefreshById { id } => {
                handler.refresh_id(*id);
                Ok(())
            }
            MessageKind::RefreshByIds { ids } => {
                for id in ids {
                    handler.refresh_id(*id);
                }
                Ok(())
            }
            MessageKind::RefreshByKey { key } => {
                handler.refresh_key(*key);
                Ok(())
            }
            MessageKind::RefreshByPayload { payload } => handler.refresh_payload(payload),
            MessageKind::RemoveById { id } => {
                handler.remove_id(*id);
                Ok(())
            }
            MessageKind::RemoveByIds { ids } => {
                for id in ids {
                    handler.remove_id(*id);
                }
                Ok(())
            }
        }
    }
}
