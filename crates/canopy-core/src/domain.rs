//! Domain entries for hostname and culture resolution.

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Maps a hostname (or hostname/path) to a content node and culture.
///
/// Wildcard domains carry a culture only; they apply to a subtree
/// without binding a hostname and are matched last during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEntry {
    /// Unique identifier of the domain assignment.
    pub id: i32,
    /// Hostname, or hostname plus a path prefix (e.g. `example.com/en`).
    pub name: String,
    /// The content node the domain is assigned to.
    pub content_id: NodeId,
    /// Culture code served under this domain (e.g. `en-US`).
    pub culture: String,
    /// True for wildcard domains, which set culture without a hostname.
    pub is_wildcard: bool,
}

impl DomainEntry {
    /// Creates a regular (non-wildcard) domain entry.
    #[must_use]
    pub fn new(id: i32, name: impl Into<String>, content_id: NodeId, culture: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            content_id,
            culture: culture.into(),
            is_wildcard: false,
        }
    }

    /// Creates a wildcard domain entry for a subtree.
    #[must_use]
    pub fn wildcard(id: i32, content_id: NodeId, culture: impl Into<String>) -> Self {
        Self {
            id,
            name: String::new(),
            content_id,
            culture: culture.into(),
            is_wildcard: true,
        }
    }

    /// Returns true if `authority` (hostname, or hostname/path) falls
    /// under this domain's name.
    #[must_use]
    pub fn matches(&self, authority: &str) -> bool {
        if self.is_wildcard {
            return false;
        }
        let name = self.name.trim_end_matches('/');
        let authority = authority.trim_end_matches('/');
        authority == name || authority.starts_with(&format!("{name}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        let d = DomainEntry::new(1, "example.com", NodeId::new(1000), "en-US");
        assert!(d.matches("example.com"));
        assert!(d.matches("example.com/"));
        assert!(!d.matches("example.org"));
    }

    #[test]
    fn path_prefix_match() {
        let d = DomainEntry::new(1, "example.com/da", NodeId::new(2000), "da-DK");
        assert!(d.matches("example.com/da"));
        assert!(d.matches("example.com/da/nyheder"));
        assert!(!d.matches("example.com/dansk"));
    }

    #[test]
    fn wildcard_never_matches_hostname() {
        let d = DomainEntry::wildcard(2, NodeId::new(3000), "fr-FR");
        assert!(!d.matches("example.com"));
        assert!(d.is_wildcard);
    }
}
