//! Serialized node rows, the persisted layout of the snapshot.
//!
//! The persisted form of a tree is one row per node keyed by node id:
//! the node serialized to JSON plus a monotonically increasing revision
//! counter. The revision lets a reader detect a stale row without
//! comparing payloads.

use crate::StoreResult;
use canopy_core::{ContentNode, NodeId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One persisted node row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRow {
    /// The node this row stores.
    pub node_id: NodeId,
    /// The node serialized to JSON.
    pub data: String,
    /// Revision counter; higher wins.
    pub rv: i64,
}

impl NodeRow {
    /// Serializes a node into a row at revision `rv`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Row`] if the node cannot be
    /// serialized.
    pub fn from_node(node: &ContentNode, rv: i64) -> StoreResult<Self> {
        Ok(Self {
            node_id: node.id,
            data: serde_json::to_string(node)?,
            rv,
        })
    }

    /// Deserializes the stored node.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Row`] if the payload cannot be
    /// parsed.
    pub fn to_node(&self) -> StoreResult<ContentNode> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

/// The latest row per node, with stale-write rejection.
#[derive(Debug, Default)]
pub struct RowTable {
    rows: RwLock<HashMap<NodeId, NodeRow>>,
}

impl RowTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a row. Returns false (and keeps the stored row) when the
    /// incoming revision is lower than the stored one; an equal
    /// revision is an idempotent re-write and succeeds.
    pub fn upsert(&self, row: NodeRow) -> bool {
        let mut rows = self.rows.write();
        if let Some(existing) = rows.get(&row.node_id) {
            if row.rv < existing.rv {
                debug!(node = %row.node_id, stored = existing.rv, incoming = row.rv, "rejecting stale row write");
                return false;
            }
        }
        rows.insert(row.node_id, row);
        true
    }

    /// Returns the stored row for a node, if any.
    #[must_use]
    pub fn get(&self, node_id: NodeId) -> Option<NodeRow> {
        self.rows.read().get(&node_id).cloned()
    }

    /// Removes the row for a node.
    pub fn remove(&self, node_id: NodeId) {
        self.rows.write().remove(&node_id);
    }

    /// Drops every row whose id fails the predicate.
    pub fn retain(&self, keep: impl Fn(NodeId) -> bool) {
        self.rows.write().retain(|id, _| keep(*id));
    }

    /// Drops every row.
    pub fn clear(&self) {
        self.rows.write().clear();
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: i32) -> ContentNode {
        ContentNode::new(NodeId::new(id), NodeId::ROOT_PARENT, 1)
    }

    #[test]
    fn row_round_trip() {
        let n = node(7);
        let row = NodeRow::from_node(&n, 3).unwrap();
        assert_eq!(row.node_id, NodeId::new(7));
        assert_eq!(row.to_node().unwrap(), n);
    }

    #[test]
    fn stale_write_is_rejected() {
        let table = RowTable::new();
        let n = node(1);

        assert!(table.upsert(NodeRow::from_node(&n, 5).unwrap()));
        assert!(!table.upsert(NodeRow::from_node(&n, 4).unwrap()));
        assert_eq!(table.get(NodeId::new(1)).unwrap().rv, 5);
    }

    #[test]
    fn equal_revision_rewrite_succeeds() {
        let table = RowTable::new();
        let n = node(1);

        assert!(table.upsert(NodeRow::from_node(&n, 5).unwrap()));
        assert!(table.upsert(NodeRow::from_node(&n, 5).unwrap()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let table = RowTable::new();
        table.upsert(NodeRow::from_node(&node(1), 1).unwrap());
        table.upsert(NodeRow::from_node(&node(2), 1).unwrap());

        table.remove(NodeId::new(1));
        assert!(table.get(NodeId::new(1)).is_none());
        assert_eq!(table.len(), 1);

        table.clear();
        assert!(table.is_empty());
    }
}
