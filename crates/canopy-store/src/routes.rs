//! The bidirectional node-id ↔ route index.

use canopy_core::NodeId;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Process-local cache of computed routes.
///
/// Entries are created lazily the first time a route is resolved and
/// evicted wholesale whenever content types or domains change — route
/// computation depends on ancestor segments and domain assignment in
/// ways too entangled to invalidate surgically, so correctness is
/// bought by clearing everything and recomputing on the next access.
///
/// The two directions are independently locked maps with no cross-map
/// transaction; the node→route direction is always written first. A
/// reader racing a write may see only one direction populated, which is
/// safe: a miss falls back to recomputation, so a transient miss is
/// never wrong.
#[derive(Debug, Default)]
pub struct RoutesCache {
    routes: RwLock<HashMap<NodeId, String>>,
    node_ids: RwLock<HashMap<String, NodeId>>,
}

impl RoutesCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a route for a node, in both directions.
    pub fn store(&self, node_id: NodeId, route: impl Into<String>) {
        let route = route.into();
        self.routes.write().insert(node_id, route.clone());
        self.node_ids.write().insert(route, node_id);
    }

    /// Returns the route cached for a node, if any.
    #[must_use]
    pub fn get_route(&self, node_id: NodeId) -> Option<String> {
        self.routes.read().get(&node_id).cloned()
    }

    /// Returns the node cached for a route, if any.
    #[must_use]
    pub fn get_node_id(&self, route: &str) -> Option<NodeId> {
        self.node_ids.read().get(route).copied()
    }

    /// Removes both directions for a node; no-op if absent.
    pub fn clear_node(&self, node_id: NodeId) {
        let route = match self.routes.write().remove(&node_id) {
            Some(route) => route,
            None => return,
        };
        self.node_ids.write().remove(&route);
    }

    /// Wholesale reset of both directions.
    pub fn clear(&self) {
        debug!("clearing routes cache");
        self.routes.write().clear();
        self.node_ids.write().clear();
    }

    /// Number of cached node→route entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    /// Returns true if no route is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}
