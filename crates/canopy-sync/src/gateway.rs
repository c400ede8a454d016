//! The distributed cache gateway.

use crate::message::{InvalidationMessage, MessageKind};
use crate::messenger::{Messenger, ServerRegistry};
use crate::refresher::RefresherId;
use crate::registry::RefresherRegistry;
use crate::SyncResult;
use canopy_core::{NodeId, NodeKey, ServerAddress};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fans out cache invalidation to every registered server in the farm.
///
/// Write-path services call this exactly once per logical change, after
/// the local mutation commits. Each call validates its input, resolves
/// the refresher, queries the server registry for the current peer list
/// and hands delivery to the messenger. The gateway keeps no state
/// between calls and is safe to share across threads.
///
/// "Nothing to do" inputs — a nil refresher id, a default-valued id or
/// key, an empty payload or an empty batch — are silent no-ops that
/// touch neither the server registry nor the messenger. This keeps call
/// sites free of guard clauses.
pub struct DistributedCache {
    registry: Arc<RefresherRegistry>,
    servers: Arc<dyn ServerRegistry>,
    messenger: Arc<dyn Messenger>,
    origin: ServerAddress,
}

impl DistributedCache {
    /// Creates a gateway for the server identified by `origin`.
    #[must_use]
    pub fn new(
        registry: Arc<RefresherRegistry>,
        servers: Arc<dyn ServerRegistry>,
        messenger: Arc<dyn Messenger>,
        origin: ServerAddress,
    ) -> Self {
        Self {
            registry,
            servers,
            messenger,
            origin,
        }
    }

    /// Refreshes a batch of entities, extracting each numeric id with
    /// `id_of`. The whole batch travels as one message.
    ///
    /// Skips instances whose extracted id is default-valued; no-ops
    /// entirely on an empty batch, a batch of only default ids, or a
    /// nil refresher id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownRefresher`] if `refresher` is
    /// not registered.
    pub fn refresh_by_ids<T>(
        &self,
        refresher: RefresherId,
        id_of: impl Fn(&T) -> NodeId,
        instances: &[T],
    ) -> SyncResult<()> {
        if refresher.is_nil() || instances.is_empty() {
            return Ok(());
        }
        let ids: Vec<NodeId> = instances
            .iter()
            .map(id_of)
            .filter(|id| !id.is_none())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        self.fan_out(refresher, MessageKind::RefreshByIds { ids }, true)
    }

    /// Refreshes a single entity by numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownRefresher`] if `refresher` is
    /// not registered.
    pub fn refresh(&self, refresher: RefresherId, id: NodeId) -> SyncResult<()> {
        if refresher.is_nil() || id.is_none() {
            return Ok(());
        }
        self.fan_out(refresher, MessageKind::RefreshById { id }, true)
    }

    /// Refreshes a single entity by GUID.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownRefresher`] if `refresher` is
    /// not registered.
    pub fn refresh_key(&self, refresher: RefresherId, key: NodeKey) -> SyncResult<()> {
        if refresher.is_nil() || key.is_nil() {
            return Ok(());
        }
        self.fan_out(refresher, MessageKind::RefreshByKey { key }, true)
    }

    /// Refreshes from an opaque JSON payload understood by the refresher.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownRefresher`] if `refresher` is
    /// not registered.
    pub fn refresh_by_payload(&self, refresher: RefresherId, payload: &str) -> SyncResult<()> {
        if refresher.is_nil() || payload.trim().is_empty() {
            return Ok(());
        }
        self.fan_out(
            refresher,
            MessageKind::RefreshByPayload {
                payload: payload.to_string(),
            },
            true,
        )
    }

    /// Refreshes everything the refresher covers, on every server.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownRefresher`] if `refresher` is
    /// not registered.
    pub fn refresh_all(&self, refresher: RefresherId) -> SyncResult<()> {
        self.refresh_all_servers(refresher, true)
    }

    /// Refreshes everything the refresher covers.
    ///
    /// When `all_servers` is false the peer list is forced empty so the
    /// refresh executes on the current server only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownRefresher`] if `refresher` is
    /// not registered.
    pub fn refresh_all_servers(
        &self,
        refresher: RefresherId,
        all_servers: bool,
    ) -> SyncResult<()> {
        if refresher.is_nil() {
            return Ok(());
        }
        self.fan_out(refresher, MessageKind::RefreshAll, all_servers)
    }

    /// Removes a single entity by numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownRefresher`] if `refresher` is
    /// not registered.
    pub fn remove(&self, refresher: RefresherId, id: NodeId) -> SyncResult<()> {
        if refresher.is_nil() || id.is_none() {
            return Ok(());
        }
        self.fan_out(refresher, MessageKind::RemoveById { id }, true)
    }

    /// Removes a batch of entities, extracting each numeric id with
    /// `id_of`. The whole batch travels as one message.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownRefresher`] if `refresher` is
    /// not registered.
    pub fn remove_by_ids<T>(
        &self,
        refresher: RefresherId,
        id_of: impl Fn(&T) -> NodeId,
        instances: &[T],
    ) -> SyncResult<()> {
        if refresher.is_nil() || instances.is_empty() {
            return Ok(());
        }
        let ids: Vec<NodeId> = instances
            .iter()
            .map(id_of)
            .filter(|id| !id.is_none())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        self.fan_out(refresher, MessageKind::RemoveByIds { ids }, true)
    }

    /// Resolves, gathers peers and hands off to the messenger.
    ///
    /// Delivery failure is logged and swallowed: local state has already
    /// been mutated by the time a peer turns out unreachable, and the
    /// stale peer is healed by the next rebuild, not by a rollback.
    fn fan_out(
        &self,
        refresher: RefresherId,
        kind: MessageKind,
        all_servers: bool,
    ) -> SyncResult<()> {
        let handler = self.registry.resolve(refresher)?;
        let peers = if all_servers {
            self.servers.current_peers()
        } else {
            Vec::new()
        };
        let message = InvalidationMessage::new(refresher, kind, self.origin.clone());

        debug!(
            refresher = handler.name(),
            peers = peers.len(),
            kind = ?message.kind,
            "fanning out invalidation"
        );

        if let Err(e) = self.messenger.deliver(&peers, &handler, &message) {
            warn!(
                refresher = handler.name(),
                error = %e,
                "invalidation delivery failed; affected peers stay stale until next rebuild"
            );
        }
        Ok(())
    }
}
