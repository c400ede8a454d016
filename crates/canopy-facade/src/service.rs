//! The facade service: view construction and change notification.

use crate::facade::{AreaView, ContentView, DomainView, Facade};
use crate::preview::{PreviewConfig, PreviewOverlay};
use crate::FacadeResult;
use canopy_core::{ContentArea, NodeId};
use canopy_store::{DomainCache, DomainSource, NodePatch, RoutesCache, TreeSource, TreeStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Flags describing what a content notification changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentChanged {
    /// True if draft state changed (open previews should re-seed).
    pub draft_changed: bool,
    /// True if the published tree changed (dependent caches cleared).
    pub published_changed: bool,
}

/// The category of a type-definition change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// A content (document) type.
    Content,
    /// A media type.
    Media,
    /// A member type.
    Member,
    /// A data type.
    Data,
}

/// One type-definition change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeChange {
    /// What category of type changed.
    pub kind: TypeKind,
    /// The type's identifier.
    pub id: i32,
}

/// Owns the caches and builds request-scoped facades over them.
///
/// One service instance per process; everything it owns is
/// constructor-injected so tests build fresh instances instead of
/// leaning on process-wide state.
pub struct FacadeService {
    store: Arc<TreeStore>,
    routes: Arc<RoutesCache>,
    domains: Arc<DomainCache>,
    previews: Arc<PreviewOverlay>,
}

impl FacadeService {
    /// Creates a service over the given sources.
    #[must_use]
    pub fn new(
        tree_source: Arc<dyn TreeSource>,
        domain_source: Arc<dyn DomainSource>,
        preview_config: PreviewConfig,
    ) -> Self {
        let store = Arc::new(TreeStore::new(tree_source));
        Self {
            routes: Arc::new(RoutesCache::new()),
            domains: Arc::new(DomainCache::new(domain_source)),
            previews: Arc::new(PreviewOverlay::new(store.clone(), preview_config)),
            store,
        }
    }

    /// The snapshot store.
    #[must_use]
    pub fn store(&self) -> &Arc<TreeStore> {
        &self.store
    }

    /// The routes cache.
    #[must_use]
    pub fn routes(&self) -> &Arc<RoutesCache> {
        &self.routes
    }

    /// The domain cache.
    #[must_use]
    pub fn domains(&self) -> &Arc<DomainCache> {
        &self.domains
    }

    /// The preview overlay.
    #[must_use]
    pub fn previews(&self) -> &Arc<PreviewOverlay> {
        &self.previews
    }

    /// Builds one immutable facade from the current cache state.
    ///
    /// With a valid preview token the content view is shadowed by that
    /// token's draft branch; an unknown or expired token falls back to
    /// the published snapshot — never an error.
    #[must_use]
    pub fn create_facade(&self, preview_token: Option<&str>) -> Facade {
        let branch = preview_token.and_then(|token| self.previews.resolve(token));

        let domains = match self.domains.all() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "domain entries unavailable; facade sees none");
                Arc::new(Vec::new())
            }
        };

        Facade::new(
            ContentView::new(
                self.store.current(ContentArea::Content),
                branch,
                self.routes.clone(),
                domains.clone(),
            ),
            AreaView::new(self.store.current(ContentArea::Media)),
            AreaView::new(self.store.current(ContentArea::Members)),
            DomainView::new(domains),
        )
    }

    /// Applies content change payloads.
    ///
    /// Unpublished nodes drop out of the published tree. The routes
    /// cache is cleared wholesale: descendant routes embed ancestor
    /// segments, so per-node clearing would leave stale entries below
    /// a renamed or moved node.
    ///
    /// # Errors
    ///
    /// Propagates [`canopy_store::StoreError`] from the snapshot store.
    pub fn notify_content(&self, payloads: &[NodePatch]) -> FacadeResult<ContentChanged> {
        if payloads.is_empty() {
            return Ok(ContentChanged::default());
        }

        let patches: Vec<NodePatch> = payloads
            .iter()
            .map(|p| {
                if p.removed || p.published {
                    p.clone()
                } else {
                    // Unpublished: gone from the published tree, still
                    // present in draft state.
                    NodePatch::remove(p.id)
                }
            })
            .collect();

        self.store.apply(ContentArea::Content, &patches)?;
        self.routes.clear();

        debug!(count = payloads.len(), "applied content notification");
        Ok(ContentChanged {
            draft_changed: true,
            published_changed: true,
        })
    }

    /// Applies media change payloads. Returns true if anything changed.
    ///
    /// # Errors
    ///
    /// Propagates [`canopy_store::StoreError`] from the snapshot store.
    pub fn notify_media(&self, payloads: &[NodePatch]) -> FacadeResult<bool> {
        if payloads.is_empty() {
            return Ok(false);
        }
        self.store.apply(ContentArea::Media, payloads)?;
        Ok(true)
    }

    /// Applies member change payloads. Returns true if anything changed.
    ///
    /// # Errors
    ///
    /// Propagates [`canopy_store::StoreError`] from the snapshot store.
    pub fn notify_members(&self, payloads: &[NodePatch]) -> FacadeResult<bool> {
        if payloads.is_empty() {
            return Ok(false);
        }
        self.store.apply(ContentArea::Members, payloads)?;
        Ok(true)
    }

    /// Applies type-definition change payloads.
    ///
    /// Routes depend on content type structure, so any content-type
    /// change clears the routes cache wholesale — deliberately coarse,
    /// correctness is bought by recomputing lazily.
    pub fn notify_content_types(&self, payloads: &[TypeChange]) {
        if payloads.iter().any(|p| p.kind == TypeKind::Content) {
            self.routes.clear();
        }
    }

    /// Applies data-type change payloads.
    ///
    /// Property value conversion caches live in the rendering layer;
    /// nothing in the core depends on data types, so this only logs.
    pub fn notify_data_types(&self, payloads: &[TypeChange]) {
        debug!(count = payloads.len(), "data type change noted");
    }

    /// Applies a domain change: domain entries reload on next access
    /// and every cached route is invalidated (routes embed domain
    /// roots).
    pub fn notify_domains(&self) {
        self.domains.invalidate();
        self.routes.clear();
    }

    /// Clears route entries for a single node.
    pub fn clear_route(&self, id: NodeId) {
        self.routes.clear_node(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{DomainEntry, NodeKey};
    use canopy_store::{NodeRecord, StoreResult};
    use pretty_assertions::assert_eq;

    struct FixtureSource;

    impl TreeSource for FixtureSource {
        fn load_tree(&self, area: ContentArea) -> StoreResult<Vec<NodeRecord>> {
            if area != ContentArea::Content {
                return Ok(Vec::new());
            }
            Ok(vec![
                record(1, -1, 1, "home", true),
                record(2, 1, 2, "news", true),
            ])
        }

        fn load_node(&self, area: ContentArea, id: NodeId) -> StoreResult<Option<NodeRecord>> {
            Ok(self
                .load_tree(area)?
                .into_iter()
                .find(|r| r.id == id))
        }

        fn load_node_by_key(
            &self,
            area: ContentArea,
            key: NodeKey,
        ) -> StoreResult<Option<NodeRecord>> {
            Ok(self.load_tree(area)?.into_iter().find(|r| r.key == key))
        }

        fn load_draft_branch(&self, root: NodeId) -> StoreResult<Vec<NodeRecord>> {
            Ok(vec![NodeRecord {
                url_segment: "draft".to_string(),
                published: false,
                ..record(root.as_i32(), 1, 2, "", false)
            }])
        }
    }

    struct NoDomains;

    impl DomainSource for NoDomains {
        fn load_domains(&self) -> StoreResult<Vec<DomainEntry>> {
            Ok(Vec::new())
        }
    }

    fn record(id: i32, parent: i32, level: u32, segment: &str, published: bool) -> NodeRecord {
        NodeRecord {
            id: NodeId::new(id),
            key: NodeKey::NIL,
            parent_id: NodeId::new(parent),
            level,
            sort_order: id,
            content_type_id: 1,
            published,
            url_segment: segment.to_string(),
            properties: Default::default(),
        }
    }

    fn service() -> FacadeService {
        let service = FacadeService::new(
            Arc::new(FixtureSource),
            Arc::new(NoDomains),
            PreviewConfig::default(),
        );
        service.store().rebuild_all().unwrap();
        service
    }

    #[test]
    fn facade_is_frozen_at_construction() {
        let service = service();
        let facade = service.create_facade(None);
        assert!(facade.content().node(NodeId::new(2)).is_some());

        service
            .notify_content(&[NodePatch::remove(NodeId::new(2))])
            .unwrap();

        // The old facade still sees node 2; a new one does not.
        assert!(facade.content().node(NodeId::new(2)).is_some());
        let fresh = service.create_facade(None);
        assert!(fresh.content().node(NodeId::new(2)).is_none());
    }

    #[test]
    fn unpublish_drops_node_from_published_tree() {
        let service = service();
        let changed = service
            .notify_content(&[NodePatch::upsert(NodeId::new(2), NodeId::new(1), 2)
                .url_segment("news")
                .published(false)])
            .unwrap();

        assert!(changed.draft_changed);
        assert!(changed.published_changed);
        let facade = service.create_facade(None);
        assert!(facade.content().node(NodeId::new(2)).is_none());
    }

    #[test]
    fn content_change_clears_affected_route() {
        let service = service();
        let facade = service.create_facade(None);
        assert_eq!(facade.content().route_for(NodeId::new(2)).unwrap(), "/news");
        assert_eq!(service.routes().len(), 1);

        service
            .notify_content(&[NodePatch::upsert(NodeId::new(2), NodeId::new(1), 2)
                .url_segment("stories")])
            .unwrap();

        assert_eq!(service.routes().len(), 0);
        let fresh = service.create_facade(None);
        assert_eq!(fresh.content().route_for(NodeId::new(2)).unwrap(), "/stories");
    }

    #[test]
    fn content_type_change_clears_routes_wholesale() {
        let service = service();
        let facade = service.create_facade(None);
        facade.content().route_for(NodeId::new(1));
        facade.content().route_for(NodeId::new(2));
        assert_eq!(service.routes().len(), 2);

        service.notify_content_types(&[TypeChange {
            kind: TypeKind::Media,
            id: 7,
        }]);
        assert_eq!(service.routes().len(), 2);

        service.notify_content_types(&[TypeChange {
            kind: TypeKind::Content,
            id: 7,
        }]);
        assert_eq!(service.routes().len(), 0);
    }

    #[test]
    fn clear_route_drops_single_entry() {
        let service = service();
        let facade = service.create_facade(None);
        facade.content().route_for(NodeId::new(1));
        facade.content().route_for(NodeId::new(2));
        assert_eq!(service.routes().len(), 2);

        service.clear_route(NodeId::new(2));
        assert_eq!(service.routes().len(), 1);
    }

    #[test]
    fn domain_change_clears_routes_and_domains() {
        let service = service();
        let facade = service.create_facade(None);
        facade.content().route_for(NodeId::new(2));
        assert_eq!(service.routes().len(), 1);

        service.notify_domains();
        assert_eq!(service.routes().len(), 0);
    }

    #[test]
    fn preview_token_shadows_content_and_falls_back() {
        let service = service();
        let token = service.previews().enter(7, NodeId::new(2)).unwrap();

        let preview = service.create_facade(Some(&token));
        assert!(preview.content().is_preview());
        assert_eq!(
            preview.content().node(NodeId::new(2)).unwrap().url_segment,
            "draft"
        );

        // Published facade is untouched.
        let published = service.create_facade(None);
        assert!(!published.content().is_preview());
        assert_eq!(
            published.content().node(NodeId::new(2)).unwrap().url_segment,
            "news"
        );

        // Unknown tokens fall back to published content.
        let fallback = service.create_facade(Some("bogus"));
        assert!(!fallback.content().is_preview());
    }

    #[test]
    fn empty_notifications_are_noops() {
        let service = service();
        assert_eq!(
            service.notify_content(&[]).unwrap(),
            ContentChanged::default()
        );
        assert!(!service.notify_media(&[]).unwrap());
        assert!(!service.notify_members(&[]).unwrap());
    }
}
