//! Collaborator traits for peer discovery and message delivery.

use crate::message::InvalidationMessage;
use crate::refresher::CacheRefresher;
use crate::{SyncError, SyncResult};
use canopy_core::ServerAddress;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Supplies the current list of peer servers in the farm.
///
/// The gateway re-queries this on every fan-out and never caches the
/// result; farm membership may change between any two calls.
pub trait ServerRegistry: Send + Sync {
    /// Returns the peers currently registered, in a stable order.
    fn current_peers(&self) -> Vec<ServerAddress>;
}

/// Delivers invalidation messages to a set of peers.
///
/// Implementations own transport, retries and per-peer failure
/// isolation; the gateway has no retry logic of its own. An empty peer
/// slice means "apply locally only". Delivery may block on network I/O,
/// so callers must not hold locks across [`Messenger::deliver`].
pub trait Messenger: Send + Sync {
    /// Delivers `message` to every peer, and applies it locally.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Delivery`] when one or more peers could not
    /// be reached. The caller treats this as non-fatal: local state was
    /// already mutated and is never rolled back.
    fn deliver(
        &self,
        peers: &[ServerAddress],
        handler: &Arc<dyn CacheRefresher>,
        message: &InvalidationMessage,
    ) -> SyncResult<()>;
}

/// A fixed-membership server registry.
///
/// Covers single-server setups (empty peer list) and farms whose
/// membership comes from static configuration. Peers can still be
/// swapped at runtime, and the gateway picks the change up on its next
/// fan-out because it never caches the list.
pub struct StaticServerRegistry {
    peers: RwLock<Vec<ServerAddress>>,
}

impl StaticServerRegistry {
    /// Creates a registry with the given peers.
    #[must_use]
    pub fn new(peers: Vec<ServerAddress>) -> Self {
        Self {
            peers: RwLock::new(peers),
        }
    }

    /// Replaces the peer list.
    pub fn set_peers(&self, peers: Vec<ServerAddress>) {
        *self.peers.write() = peers;
    }
}

impl ServerRegistry for StaticServerRegistry {
    fn current_peers(&self) -> Vec<ServerAddress> {
        self.peers.read().clone()
    }
}

/// An in-process messenger.
///
/// Applies each message directly to the resolved handler and ignores
/// the peer list. This is the delivery mode of a single-server install,
/// and the building block remote transports wrap: whatever ships the
/// message across the wire ends up calling
/// [`InvalidationMessage::apply_to`] on the receiving side, exactly as
/// this does.
#[derive(Debug, Default)]
pub struct LocalMessenger;

impl LocalMessenger {
    /// Creates a new local messenger.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Messenger for LocalMessenger {
    fn deliver(
        &self,
        peers: &[ServerAddress],
        handler: &Arc<dyn CacheRefresher>,
        message: &InvalidationMessage,
    ) -> SyncResult<()> {
        debug!(
            refresher = handler.name(),
            peers = peers.len(),
            "applying invalidation locally"
        );
        message
            .apply_to(handler.as_ref())
            .map_err(|e| SyncError::Delivery(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::refresher::RefresherId;
    use canopy_core::{NodeId, NodeKey};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingRefresher {
        refreshed: Mutex<Vec<NodeId>>,
    }

    impl CacheRefresher for RecordingRefresher {
        fn id(&self) -> RefresherId {
            RefresherId::CONTENT
        }
        fn name(&self) -> &str {
            "recording"
        }
        fn refresh_all(&self) {}
        fn refresh_id(&self, id: NodeId) {
            self.refreshed.lock().push(id);
        }
        fn refresh_key(&self, _key: NodeKey) {}
        fn refresh_payload(&self, _payload: &str) -> SyncResult<()> {
            Ok(())
        }
        fn remove_id(&self, _id: NodeId) {}
    }

    #[test]
    fn static_registry_reports_current_peers() {
        let registry = StaticServerRegistry::new(vec![ServerAddress::new("a")]);
        assert_eq!(registry.current_peers().len(), 1);

        registry.set_peers(vec![ServerAddress::new("a"), ServerAddress::new("b")]);
        assert_eq!(registry.current_peers().len(), 2);
    }

    #[test]
    fn local_messenger_applies_message() {
        let refresher = Arc::new(RecordingRefresher::default());
        let handler: Arc<dyn CacheRefresher> = refresher.clone();
        let messenger = LocalMessenger::new();

        let message = InvalidationMessage::new(
            RefresherId::CONTENT,
            MessageKind::RefreshById {
                id: NodeId::new(42),
            },
            ServerAddress::new("origin"),
        );
        messenger.deliver(&[], &handler, &message).unwrap();

        assert_eq!(*refresher.refreshed.lock(), vec![NodeId::new(42)]);
    }
}
