//! Cache refresher identity and handler contract.

use crate::SyncResult;
use canopy_core::{NodeId, NodeKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The stable identity of a cache refresher.
///
/// Each category of cached state (content, media, domains, ...) is
/// invalidated through one refresher, addressed by a UUID that is the
/// same on every server of the farm and never changes between releases.
/// The nil id is the no-op sentinel at gateway call sites.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefresherId(Uuid);

impl RefresherId {
    /// The nil id; gateway calls with it are defined as no-ops.
    pub const NIL: RefresherId = RefresherId(Uuid::nil());

    /// Refresher for the published content tree.
    pub const CONTENT: RefresherId =
        RefresherId(Uuid::from_u128(0x9c1c_7a6b_41d2_4b8a_a63e_0f2d_5b8c_1a90));

    /// Refresher for the media tree.
    pub const MEDIA: RefresherId =
        RefresherId(Uuid::from_u128(0x4d67_0c8e_fa11_4f3c_9b57_2ce8_88b1_0d24));

    /// Refresher for the member directory.
    pub const MEMBER: RefresherId =
        RefresherId(Uuid::from_u128(0x71f5_3e02_6bd9_4e40_8c1a_9ad4_417f_6e83));

    /// Refresher for domain assignments.
    pub const DOMAIN: RefresherId =
        RefresherId(Uuid::from_u128(0xe3a8_4bd1_2090_49c7_b5f2_6617_c4da_95f1));

    /// Refresher for content type (document type) definitions.
    pub const CONTENT_TYPE: RefresherId =
        RefresherId(Uuid::from_u128(0x25b3_9d7f_c561_4871_83be_dc40_72e9_3ab7));

    /// Refresher for data type definitions.
    pub const DATA_TYPE: RefresherId =
        RefresherId(Uuid::from_u128(0xb8e0_12c4_8f76_4a2d_9d03_54a1_eb6f_28c5));

    /// Creates a refresher id from a UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is the nil id.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Debug for RefresherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefresherId({})", self.0)
    }
}

impl fmt::Display for RefresherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A handler that invalidates one category of local cache state.
///
/// Implementations are registered once during startup and must be safe
/// to call from any request thread. The same handler runs on the
/// origin server and, via the messenger, on every peer; handlers must
/// therefore be idempotent — applying the same notification twice has
/// to land in the same state as applying it once.
pub trait CacheRefresher: Send + Sync {
    /// The stable identity of this refresher.
    fn id(&self) -> RefresherId;

    /// A short human-readable name, for logs and errors.
    fn name(&self) -> &str;

    /// Invalidates everything this refresher is responsible for.
    fn refresh_all(&self);

    /// Invalidates the state associated with a single numeric id.
    fn refresh_id(&self, id: NodeId);

    /// Invalidates the state associated with a single GUID.
    fn refresh_key(&self, key: NodeKey);

    /// Applies a structured JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::MalformedPayload`] when the payload
    /// cannot be parsed; well-formed items in a batch are still applied.
    fn refresh_payload(&self, payload: &str) -> SyncResult<()>;

    /// Removes the state associated with a single numeric id.
    fn remove_id(&self, id: NodeId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nil_id_is_default() {
        assert_eq!(RefresherId::default(), RefresherId::NIL);
        assert!(RefresherId::NIL.is_nil());
    }

    #[test]
    fn well_known_ids_are_distinct() {
        let ids = [
            RefresherId::CONTENT,
            RefresherId::MEDIA,
            RefresherId::MEMBER,
            RefresherId::DOMAIN,
            RefresherId::CONTENT_TYPE,
            RefresherId::DATA_TYPE,
        ];
        for (i, a) in ids.iter().enumerate() {
            assert!(!a.is_nil());
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn id_serde_round_trip() {
        let json = serde_json::to_string(&RefresherId::DOMAIN).unwrap();
        let back: RefresherId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RefresherId::DOMAIN);
    }
}
