//! Immutable tree snapshots.

use canopy_core::{ContentArea, ContentNode, NodeId, NodeKey};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// The canonical in-memory representation of one content tree at a
/// point in time.
///
/// Snapshots are immutable once published; mutation happens by building
/// a replacement (see [`crate::SnapshotBuilder`]) and swapping it in.
/// Every non-root node's parent resolves to a node in the same
/// snapshot; root nodes carry [`NodeId::ROOT_PARENT`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSnapshot {
    area: ContentArea,
    nodes: HashMap<NodeId, ContentNode>,
    roots: Vec<NodeId>,
}

impl ContentSnapshot {
    /// Creates an empty snapshot for an area.
    #[must_use]
    pub fn empty(area: ContentArea) -> Self {
        Self {
            area,
            nodes: HashMap::new(),
            roots: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        area: ContentArea,
        nodes: HashMap<NodeId, ContentNode>,
        roots: Vec<NodeId>,
    ) -> Self {
        Self { area, nodes, roots }
    }

    /// The content area this snapshot belongs to.
    #[must_use]
    pub fn area(&self) -> ContentArea {
        self.area
    }

    /// Looks up a node by numeric id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ContentNode> {
        self.nodes.get(&id)
    }

    /// Looks up a node by GUID.
    #[must_use]
    pub fn node_by_key(&self, key: NodeKey) -> Option<&ContentNode> {
        if key.is_nil() {
            return None;
        }
        self.nodes.values().find(|n| n.key == key)
    }

    /// Returns true if the snapshot contains `id`.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Root node ids, ordered by sort order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The children of a node, in sort order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<&ContentNode> {
        match self.nodes.get(&id) {
            Some(node) => node
                .children
                .iter()
                .filter_map(|c| self.nodes.get(c))
                .collect(),
            None => Vec::new(),
        }
    }

    /// All descendants of a node, depth-first in sort order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<&ContentNode> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        let mut seen = HashSet::new();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            if let Some(node) = self.nodes.get(&next) {
                out.push(node);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// The number of nodes in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the snapshot holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes.values()
    }

    /// Checks structural invariants without mutating.
    ///
    /// Verifies that every non-root parent reference resolves, that
    /// child lists agree with parent references, and that levels are
    /// consistent. Violations are logged; the first one found makes the
    /// whole check false so operators can trigger a rebuild.
    #[must_use]
    pub fn verify(&self) -> bool {
        let mut ok = true;
        for node in self.nodes.values() {
            if node.is_root() {
                if node.level != 1 {
                    warn!(area = %self.area, id = %node.id, level = node.level, "root node with non-root level");
                    ok = false;
                }
            } else {
                match self.nodes.get(&node.parent_id) {
                    None => {
                        warn!(area = %self.area, id = %node.id, parent = %node.parent_id, "orphaned parent reference");
                        ok = false;
                    }
                    Some(parent) => {
                        if node.level != parent.level + 1 {
                            warn!(area = %self.area, id = %node.id, "level inconsistent with parent");
                            ok = false;
                        }
                        if !parent.children.contains(&node.id) {
                            warn!(area = %self.area, id = %node.id, "node missing from parent's child list");
                            ok = false;
                        }
                    }
                }
            }
            let mut seen = HashSet::new();
            for child in &node.children {
                if !seen.insert(*child) {
                    warn!(area = %self.area, id = %node.id, child = %child, "duplicate child entry");
                    ok = false;
                }
                match self.nodes.get(child) {
                    None => {
                        warn!(area = %self.area, id = %node.id, child = %child, "child entry points at missing node");
                        ok = false;
                    }
                    Some(c) if c.parent_id != node.id => {
                        warn!(area = %self.area, id = %node.id, child = %child, "child's parent reference disagrees");
                        ok = false;
                    }
                    Some(_) => {}
                }
            }
        }
        for root in &self.roots {
            match self.nodes.get(root) {
                None => {
                    warn!(area = %self.area, root = %root, "root entry points at missing node");
                    ok = false;
                }
                Some(n) if !n.is_root() => {
                    warn!(area = %self.area, root = %root, "root entry points at non-root node");
                    ok = false;
                }
                Some(_) => {}
            }
        }
        ok
    }
}
