//! Identifier types for Canopy entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The numeric identity of a content tree node.
///
/// Node ids come from the persistence layer and are positive for real
/// nodes. The default value (`NodeId::NONE`, zero) is interpreted by
/// the invalidation gateway as "nothing to do" rather than an error.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(i32);

impl NodeId {
    /// The default-valued id, treated as a no-op at invalidation call sites.
    pub const NONE: NodeId = NodeId(0);

    /// The sentinel parent id carried by root nodes.
    pub const ROOT_PARENT: NodeId = NodeId(-1);

    /// Creates a node id from its raw numeric value.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// Returns true if this is the default-valued id.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if this is the root-parent sentinel.
    #[must_use]
    pub const fn is_root_parent(&self) -> bool {
        self.0 == -1
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for NodeId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// The GUID identity of a content tree node.
///
/// Nodes carry both a numeric id (used for tree structure) and a stable
/// GUID (used when refreshing by key). The nil GUID is the no-op value.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey(Uuid);

impl NodeKey {
    /// The nil key, treated as a no-op at invalidation call sites.
    pub const NIL: NodeKey = NodeKey(Uuid::nil());

    /// Creates a node key from a UUID.
    #[must_use]
    pub const fn new(key: Uuid) -> Self {
        Self(key)
    }

    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is the nil key.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({})", self.0)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The opaque network identity of a peer server in the farm.
///
/// Canopy never interprets the address; it is handed to the messenger
/// collaborator as-is. Typically a base URL or machine name.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddress(String);

impl ServerAddress {
    /// Creates a server address from any string-like value.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerAddress({})", self.0)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ServerAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn node_id_none_is_default() {
        assert_eq!(NodeId::default(), NodeId::NONE);
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::new(42).is_none());
    }

    #[test]
    fn node_id_root_parent() {
        assert!(NodeId::ROOT_PARENT.is_root_parent());
        assert_eq!(NodeId::ROOT_PARENT.as_i32(), -1);
    }

    #[test]
    fn node_key_nil_is_default() {
        assert_eq!(NodeKey::default(), NodeKey::NIL);
        assert!(NodeKey::NIL.is_nil());
        assert!(!NodeKey::generate().is_nil());
    }

    #[test]
    fn server_address_display() {
        let addr = ServerAddress::new("https://front-01.example.com");
        assert_eq!(addr.to_string(), "https://front-01.example.com");
        assert_eq!(addr.as_str(), "https://front-01.example.com");
    }
}
