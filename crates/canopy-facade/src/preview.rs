//! Token-scoped preview branches of draft content.

use canopy_core::{NodeId, Timestamp};
use canopy_store::{ContentSnapshot, StoreResult, TreeStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Configuration for the preview overlay.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// How long a preview branch stays valid after creation.
    pub max_age: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(30 * 60),
        }
    }
}

/// A shadow copy of a draft subtree, scoped to one token.
///
/// Seeded from the draft (not published) state of a node and its
/// descendants; never merged into the published snapshot.
#[derive(Debug, Clone)]
pub struct PreviewBranch {
    /// The unguessable token identifying this branch.
    pub token: String,
    /// The editor who opened the preview.
    pub user_id: i32,
    /// The content node the branch is rooted at.
    pub root: NodeId,
    /// The draft subtree.
    pub snapshot: Arc<ContentSnapshot>,
    /// When the branch was seeded.
    pub created_at: Timestamp,
    /// When the branch stops resolving.
    pub expires_at: Timestamp,
}

impl PreviewBranch {
    /// Returns true if the branch has reached its expiry.
    ///
    /// The boundary is inclusive: a branch whose expiry equals the
    /// current instant no longer resolves, so a zero `max_age` disables
    /// previews outright.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        !Timestamp::now().is_before(self.expires_at)
    }
}

/// Holds every live preview branch, keyed by token.
///
/// Multiple previews may coexist per user. Branches expire after
/// [`PreviewConfig::max_age`] even if [`PreviewOverlay::exit`] is never
/// called; [`PreviewOverlay::purge_expired`] reclaims them.
pub struct PreviewOverlay {
    store: Arc<TreeStore>,
    config: PreviewConfig,
    branches: RwLock<HashMap<String, PreviewBranch>>,
}

impl PreviewOverlay {
    /// Creates an overlay seeding branches from `store`.
    #[must_use]
    pub fn new(store: Arc<TreeStore>, config: PreviewConfig) -> Self {
        Self {
            store,
            config,
            branches: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a preview of the draft subtree under `root` and returns
    /// its token.
    ///
    /// # Errors
    ///
    /// Returns [`canopy_store::StoreError::Source`] when the draft
    /// state cannot be loaded.
    pub fn enter(&self, user_id: i32, root: NodeId) -> StoreResult<String> {
        let token = Uuid::new_v4().simple().to_string();
        let snapshot = Arc::new(self.store.draft_branch(root)?);
        let created_at = Timestamp::now();
        let branch = PreviewBranch {
            token: token.clone(),
            user_id,
            root,
            snapshot,
            created_at,
            expires_at: created_at.plus(self.config.max_age),
        };
        info!(user = user_id, root = %root, "entering preview");
        self.branches.write().insert(token.clone(), branch);
        Ok(token)
    }

    /// Re-seeds the branch behind `token` from current draft state.
    ///
    /// No-op when the token is blank or unknown.
    ///
    /// # Errors
    ///
    /// Returns [`canopy_store::StoreError::Source`] when the draft
    /// state cannot be loaded.
    pub fn refresh(&self, token: &str, content_id: NodeId) -> StoreResult<()> {
        if token.trim().is_empty() {
            return Ok(());
        }
        if !self.branches.read().contains_key(token) {
            return Ok(());
        }
        let snapshot = Arc::new(self.store.draft_branch(content_id)?);
        let mut branches = self.branches.write();
        if let Some(branch) = branches.get_mut(token) {
            debug!(token, root = %content_id, "re-seeding preview branch");
            branch.root = content_id;
            branch.snapshot = snapshot;
            branch.created_at = Timestamp::now();
            branch.expires_at = branch.created_at.plus(self.config.max_age);
        }
        Ok(())
    }

    /// Discards the branch behind `token`; no-op when blank or unknown.
    pub fn exit(&self, token: &str) {
        if token.trim().is_empty() {
            return;
        }
        if self.branches.write().remove(token).is_some() {
            debug!(token, "exited preview");
        }
    }

    /// Resolves a token to its branch snapshot, honoring expiry.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<Arc<ContentSnapshot>> {
        let branches = self.branches.read();
        let branch = branches.get(token)?;
        if branch.is_expired() {
            return None;
        }
        Some(branch.snapshot.clone())
    }

    /// Drops every expired branch; returns how many were reclaimed.
    pub fn purge_expired(&self) -> usize {
        let mut branches = self.branches.write();
        let before = branches.len();
        branches.retain(|_, b| !b.is_expired());
        let purged = before - branches.len();
        if purged > 0 {
            info!(purged, "purged expired preview branches");
        }
        purged
    }

    /// Number of live (possibly expired, not yet purged) branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.branches.read().len()
    }

    /// Returns true if no branch is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.read().is_empty()
    }
}
