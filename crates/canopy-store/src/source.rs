//! Collaborator traits at the persistence boundary.

use crate::StoreResult;
use canopy_core::{ContentArea, DomainEntry, NodeId, NodeKey, Properties};
use serde::{Deserialize, Serialize};

/// One node as loaded from persistence.
///
/// Records are flat; tree structure (child lists, root ordering) is
/// derived when a snapshot is built from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Numeric identity.
    pub id: NodeId,
    /// GUID identity.
    #[serde(default)]
    pub key: NodeKey,
    /// Parent id; `NodeId::ROOT_PARENT` for roots.
    pub parent_id: NodeId,
    /// Depth in the tree.
    pub level: u32,
    /// Position among siblings.
    #[serde(default)]
    pub sort_order: i32,
    /// Document type.
    #[serde(default)]
    pub content_type_id: i32,
    /// Published state.
    #[serde(default)]
    pub published: bool,
    /// URL name segment.
    #[serde(default)]
    pub url_segment: String,
    /// Property values.
    #[serde(default)]
    pub properties: Properties,
}

/// Loads content trees from the upstream persistence layer.
///
/// Used for cold-start rebuilds, after detected corruption, and to seed
/// preview branches from draft state. Implementations live outside the
/// core (database, import files, fixtures).
pub trait TreeSource: Send + Sync {
    /// Loads every published node of an area.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when the upstream store
    /// cannot be read.
    fn load_tree(&self, area: ContentArea) -> StoreResult<Vec<NodeRecord>>;

    /// Loads a single node of an area, or `None` if it no longer
    /// exists upstream.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when the upstream store
    /// cannot be read.
    fn load_node(&self, area: ContentArea, id: NodeId) -> StoreResult<Option<NodeRecord>>;

    /// Loads a single node of an area by GUID, or `None` if it does
    /// not exist upstream. Lets a server resolve a node it has only
    /// ever heard of by key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when the upstream store
    /// cannot be read.
    fn load_node_by_key(&self, area: ContentArea, key: NodeKey)
        -> StoreResult<Option<NodeRecord>>;

    /// Loads the draft state of the subtree rooted at `root`,
    /// including the root itself.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when the upstream store
    /// cannot be read.
    fn load_draft_branch(&self, root: NodeId) -> StoreResult<Vec<NodeRecord>>;
}

/// Loads domain assignments from persistence.
pub trait DomainSource: Send + Sync {
    /// Loads all domain entries.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when the upstream store
    /// cannot be read.
    fn load_domains(&self) -> StoreResult<Vec<DomainEntry>>;
}
