//! The content tree node model.

use crate::{NodeId, NodeKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bag of property values attached to a node.
///
/// Property values are kept as raw JSON so the cache stays agnostic of
/// document type schemas; interpretation happens in the rendering layer.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// The content areas served by the cache, each holding its own tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentArea {
    /// The published page tree.
    Content,
    /// The media library tree.
    Media,
    /// The member directory.
    Members,
}

impl ContentArea {
    /// All areas, in rebuild order.
    pub const ALL: [ContentArea; 3] = [
        ContentArea::Content,
        ContentArea::Media,
        ContentArea::Members,
    ];
}

impl fmt::Display for ContentArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentArea::Content => "content",
            ContentArea::Media => "media",
            ContentArea::Members => "members",
        };
        write!(f, "{name}")
    }
}

/// One node of a content tree.
///
/// A node knows its position (parent, level, sort order), its document
/// type, its published state and its property values. Child ids are
/// kept ordered by sort order so tree traversal needs no extra sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    /// Numeric identity of the node.
    pub id: NodeId,
    /// Stable GUID identity of the node.
    pub key: NodeKey,
    /// Parent node id; `NodeId::ROOT_PARENT` for root nodes.
    pub parent_id: NodeId,
    /// Depth in the tree, 1 for root nodes.
    pub level: u32,
    /// Position among siblings.
    pub sort_order: i32,
    /// Identifier of the node's document type.
    pub content_type_id: i32,
    /// Whether the node is published.
    pub published: bool,
    /// URL name segment of the node (lowercased, hyphenated).
    pub url_segment: String,
    /// Property values, raw JSON per property alias.
    pub properties: Properties,
    /// Child node ids, ordered by sort order.
    pub children: Vec<NodeId>,
}

impl ContentNode {
    /// Creates a bare node with empty properties and no children.
    #[must_use]
    pub fn new(id: NodeId, parent_id: NodeId, level: u32) -> Self {
        Self {
            id,
            key: NodeKey::NIL,
            parent_id,
            level,
            sort_order: 0,
            content_type_id: 0,
            published: false,
            url_segment: String::new(),
            properties: Properties::new(),
            children: Vec::new(),
        }
    }

    /// Returns true if this node sits at the root of its tree.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_root_parent()
    }

    /// Returns the value of a property, if present.
    #[must_use]
    pub fn property(&self, alias: &str) -> Option<&serde_json::Value> {
        self.properties.get(alias)
    }
}
