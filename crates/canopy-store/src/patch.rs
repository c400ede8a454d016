//! Incremental snapshot patches.

use crate::snapshot::ContentSnapshot;
use canopy_core::{ContentNode, NodeId, NodeKey, Properties};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One incremental change to a tree: add, update, move or remove a node.
///
/// A patch carries the full target state of the node, so re-applying it
/// is a no-op and application order within a batch does not matter for
/// disjoint subtrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    /// The affected node.
    pub id: NodeId,
    /// The node's GUID.
    #[serde(default)]
    pub key: NodeKey,
    /// The (possibly new) parent.
    pub parent_id: NodeId,
    /// Depth in the tree after the change.
    pub level: u32,
    /// Position among siblings after the change.
    #[serde(default)]
    pub sort_order: i32,
    /// Document type of the node.
    #[serde(default)]
    pub content_type_id: i32,
    /// Published state after the change.
    #[serde(default)]
    pub published: bool,
    /// URL name segment after the change.
    #[serde(default)]
    pub url_segment: String,
    /// Property values after the change.
    #[serde(default)]
    pub properties: Properties,
    /// True if the node (and its subtree) was removed.
    #[serde(default)]
    pub removed: bool,
}

impl NodePatch {
    /// Creates an upsert patch for a node.
    #[must_use]
    pub fn upsert(id: NodeId, parent_id: NodeId, level: u32) -> Self {
        Self {
            id,
            key: NodeKey::NIL,
            parent_id,
            level,
            sort_order: 0,
            content_type_id: 0,
            published: true,
            url_segment: String::new(),
            properties: Properties::new(),
            removed: false,
        }
    }

    /// Creates a removal patch for a node and its subtree.
    #[must_use]
    pub fn remove(id: NodeId) -> Self {
        Self {
            id,
            key: NodeKey::NIL,
            parent_id: NodeId::NONE,
            level: 0,
            sort_order: 0,
            content_type_id: 0,
            published: false,
            url_segment: String::new(),
            properties: Properties::new(),
            removed: true,
        }
    }

    /// Sets the node key.
    #[must_use]
    pub fn key(mut self, key: NodeKey) -> Self {
        self.key = key;
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Sets the URL segment.
    #[must_use]
    pub fn url_segment(mut self, segment: impl Into<String>) -> Self {
        self.url_segment = segment.into();
        self
    }

    /// Sets the published state.
    #[must_use]
    pub fn published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn content_type(mut self, content_type_id: i32) -> Self {
        self.content_type_id = content_type_id;
        self
    }

    /// Sets the property bag.
    #[must_use]
    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    fn to_node(&self) -> ContentNode {
        ContentNode {
            id: self.id,
            key: self.key,
            parent_id: self.parent_id,
            level: self.level,
            sort_order: self.sort_order,
            content_type_id: self.content_type_id,
            published: self.published,
            url_segment: self.url_segment.clone(),
            properties: self.properties.clone(),
            children: Vec::new(),
        }
    }
}

/// Counters describing one build pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Nodes inserted or updated.
    pub applied: usize,
    /// Nodes removed (including removed descendants).
    pub removed: usize,
    /// Patches whose parent never became visible; the nodes are left
    /// out of the built snapshot until a later patch or a rebuild
    /// resolves them.
    pub deferred: usize,
    /// Malformed patches (e.g. self-parented) skipped while the rest
    /// of the batch applied.
    pub skipped: usize,
}

/// Builds a replacement snapshot from a base snapshot plus patches.
///
/// Patches referencing a parent not present locally are held as pending
/// and re-examined as other patches land — not-yet-visible, not an
/// error. Child lists and root ordering are recomputed wholesale at
/// build time from parent references and sort orders, which is what
/// makes patch application idempotent and order-independent.
pub struct SnapshotBuilder {
    base: ContentSnapshot,
    nodes: HashMap<NodeId, ContentNode>,
    pending: HashMap<NodeId, NodePatch>,
    stats: BuildStats,
}

impl SnapshotBuilder {
    /// Starts a build from an existing snapshot.
    #[must_use]
    pub fn new(base: ContentSnapshot) -> Self {
        let nodes = base.iter().map(|n| (n.id, n.clone())).collect();
        Self {
            base,
            nodes,
            pending: HashMap::new(),
            stats: BuildStats::default(),
        }
    }

    /// Applies a batch of patches.
    ///
    /// Malformed items (a node claiming itself as parent) are skipped
    /// and counted; the rest of the batch still applies. Within a
    /// batch the last patch for an id wins, whether earlier ones
    /// applied or were deferred.
    pub fn apply(&mut self, patches: &[NodePatch]) {
        for patch in patches {
            if patch.removed {
                self.remove_subtree(patch.id);
            } else if patch.parent_id == patch.id {
                warn!(id = %patch.id, "skipping self-parented patch");
                self.stats.skipped += 1;
            } else if self.parent_visible(patch) {
                self.upsert(patch);
            } else {
                debug!(id = %patch.id, parent = %patch.parent_id, "deferring patch until parent is visible");
                self.pending.insert(patch.id, patch.clone());
            }
        }
        self.drain_pending();
    }

    /// Finishes the build, producing the replacement snapshot.
    #[must_use]
    pub fn build(mut self) -> (ContentSnapshot, BuildStats) {
        self.stats.deferred = self.pending.len();

        // Child lists and root ordering are derived state; recompute
        // them from scratch so they can never drift from parent refs.
        let mut by_parent: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in self.nodes.values() {
            by_parent.entry(node.parent_id).or_default().push(node.id);
        }
        for ids in by_parent.values_mut() {
            ids.sort_by_key(|id| {
                let n = &self.nodes[id];
                (n.sort_order, n.id)
            });
        }
        let roots = by_parent.remove(&NodeId::ROOT_PARENT).unwrap_or_default();
        for node in self.nodes.values_mut() {
            node.children = by_parent.remove(&node.id).unwrap_or_default();
        }

        let snapshot = ContentSnapshot::from_parts(self.base.area(), self.nodes, roots);
        (snapshot, self.stats)
    }

    fn parent_visible(&self, patch: &NodePatch) -> bool {
        patch.parent_id.is_root_parent() || self.nodes.contains_key(&patch.parent_id)
    }

    fn upsert(&mut self, patch: &NodePatch) {
        // A landed patch supersedes any deferred one for the same id.
        self.pending.remove(&patch.id);
        self.nodes.insert(patch.id, patch.to_node());
        self.stats.applied += 1;
    }

    fn remove_subtree(&mut self, id: NodeId) {
        self.pending.remove(&id);
        if self.nodes.remove(&id).is_none() {
            return;
        }
        self.stats.removed += 1;

        // Descendants are found by parent reference; child lists are
        // only computed at build time.
        let mut frontier = vec![id];
        while let Some(parent) = frontier.pop() {
            let doomed: Vec<NodeId> = self
                .nodes
                .values()
                .filter(|n| n.parent_id == parent)
                .map(|n| n.id)
                .collect();
            for child in doomed {
                self.nodes.remove(&child);
                self.pending.remove(&child);
                self.stats.removed += 1;
                frontier.push(child);
            }
        }
    }

    fn drain_pending(&mut self) {
        loop {
            let ready: Vec<NodeId> = self
                .pending
                .values()
                .filter(|p| p.parent_id.is_root_parent() || self.nodes.contains_key(&p.parent_id))
                .map(|p| p.id)
                .collect();
            if ready.is_empty() {
                return;
            }
            for id in ready {
                if let Some(patch) = self.pending.remove(&id) {
                    self.upsert(&patch);
                }
            }
        }
    }
}
