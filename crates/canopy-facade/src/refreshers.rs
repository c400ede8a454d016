//! The built-in cache refresher set.
//!
//! Each refresher translates invalidation notifications arriving through
//! the gateway into operations on the local stores. The same refresher
//! instance handles notifications that originated locally and those
//! delivered from peers, so every handler here is idempotent.
//!
//! Handlers swallow store errors after logging them: a refresher runs in
//! the delivery path and a failed partial refresh must not wedge the
//! farm. The affected area stays stale until the next notification or
//! rebuild.

use crate::service::{FacadeService, TypeChange};
use crate::FacadeResult;
use canopy_core::{ContentArea, NodeId, NodeKey};
use canopy_store::NodePatch;
use canopy_sync::{CacheRefresher, RefresherId, RefresherRegistry, SyncError, SyncResult};
use std::sync::Arc;
use tracing::warn;

/// Parses a JSON array payload, skipping items that fail to decode.
///
/// A payload that is not a JSON array at all is malformed as a whole;
/// a bad element inside an otherwise well-formed array is skipped and
/// logged so the rest of the batch still applies.
fn parse_items<T: serde::de::DeserializeOwned>(name: &str, payload: &str) -> SyncResult<Vec<T>> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(payload).map_err(|e| SyncError::malformed(name, e.to_string()))?;
    let mut items = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value(value) {
            Ok(item) => items.push(item),
            Err(e) => warn!(refresher = name, error = %e, "skipping malformed payload item"),
        }
    }
    Ok(items)
}

/// Invalidates the published content tree and dependent routes.
pub struct ContentCacheRefresher {
    service: Arc<FacadeService>,
}

impl ContentCacheRefresher {
    /// Creates a content refresher over `service`.
    #[must_use]
    pub fn new(service: Arc<FacadeService>) -> Self {
        Self { service }
    }
}

impl CacheRefresher for ContentCacheRefresher {
    fn id(&self) -> RefresherId {
        RefresherId::CONTENT
    }

    fn name(&self) -> &str {
        "content"
    }

    fn refresh_all(&self) {
        if let Err(e) = self.service.store().rebuild(ContentArea::Content) {
            warn!(error = %e, "content rebuild failed; tree left stale");
            return;
        }
        self.service.routes().clear();
    }

    fn refresh_id(&self, id: NodeId) {
        if let Err(e) = self.service.store().refresh_node(ContentArea::Content, id) {
            warn!(error = %e, node = %id, "content node refresh failed");
            return;
        }
        // Descendant routes embed this node's segment.
        self.service.routes().clear();
    }

    fn refresh_key(&self, key: NodeKey) {
        // Resolved against the source, not the snapshot, so a node this
        // server has only ever heard of by GUID still comes in.
        if let Err(e) = self
            .service
            .store()
            .refresh_node_by_key(ContentArea::Content, key)
        {
            warn!(error = %e, %key, "content key refresh failed");
            return;
        }
        self.service.routes().clear();
    }

    fn refresh_payload(&self, payload: &str) -> SyncResult<()> {
        let patches: Vec<NodePatch> = parse_items(self.name(), payload)?;
        if let Err(e) = self.service.notify_content(&patches) {
            warn!(error = %e, "content payload apply failed; tree left stale");
        }
        Ok(())
    }

    fn remove_id(&self, id: NodeId) {
        if let Err(e) = self
            .service
            .store()
            .apply(ContentArea::Content, &[NodePatch::remove(id)])
        {
            warn!(error = %e, node = %id, "content node removal failed");
            return;
        }
        self.service.routes().clear();
    }
}

/// Invalidates the media tree.
pub struct MediaCacheRefresher {
    service: Arc<FacadeService>,
}

impl MediaCacheRefresher {
    /// Creates a media refresher over `service`.
    #[must_use]
    pub fn new(service: Arc<FacadeService>) -> Self {
        Self { service }
    }

    fn apply(&self, patches: &[NodePatch]) {
        if let Err(e) = self.service.store().apply(ContentArea::Media, patches) {
            warn!(error = %e, "media patch apply failed; tree left stale");
        }
    }
}

impl CacheRefresher for MediaCacheRefresher {
    fn id(&self) -> RefresherId {
        RefresherId::MEDIA
    }

    fn name(&self) -> &str {
        "media"
    }

    fn refresh_all(&self) {
        if let Err(e) = self.service.store().rebuild(ContentArea::Media) {
            warn!(error = %e, "media rebuild failed; tree left stale");
        }
    }

    fn refresh_id(&self, id: NodeId) {
        if let Err(e) = self.service.store().refresh_node(ContentArea::Media, id) {
            warn!(error = %e, node = %id, "media node refresh failed");
        }
    }

    fn refresh_key(&self, key: NodeKey) {
        if let Err(e) = self
            .service
            .store()
            .refresh_node_by_key(ContentArea::Media, key)
        {
            warn!(error = %e, %key, "media key refresh failed");
        }
    }

    fn refresh_payload(&self, payload: &str) -> SyncResult<()> {
        let patches: Vec<NodePatch> = parse_items(self.name(), payload)?;
        if let Err(e) = self.service.notify_media(&patches) {
            warn!(error = %e, "media payload apply failed; tree left stale");
        }
        Ok(())
    }

    fn remove_id(&self, id: NodeId) {
        self.apply(&[NodePatch::remove(id)]);
    }
}

/// Invalidates the member directory.
pub struct MemberCacheRefresher {
    service: Arc<FacadeService>,
}

impl MemberCacheRefresher {
    /// Creates a member refresher over `service`.
    #[must_use]
    pub fn new(service: Arc<FacadeService>) -> Self {
        Self { service }
    }
}

impl CacheRefresher for MemberCacheRefresher {
    fn id(&self) -> RefresherId {
        RefresherId::MEMBER
    }

    fn name(&self) -> &str {
        "member"
    }

    fn refresh_all(&self) {
        if let Err(e) = self.service.store().rebuild(ContentArea::Members) {
            warn!(error = %e, "member rebuild failed; tree left stale");
        }
    }

    fn refresh_id(&self, id: NodeId) {
        if let Err(e) = self.service.store().refresh_node(ContentArea::Members, id) {
            warn!(error = %e, node = %id, "member refresh failed");
        }
    }

    fn refresh_key(&self, key: NodeKey) {
        if let Err(e) = self
            .service
            .store()
            .refresh_node_by_key(ContentArea::Members, key)
        {
            warn!(error = %e, %key, "member key refresh failed");
        }
    }

    fn refresh_payload(&self, payload: &str) -> SyncResult<()> {
        let patches: Vec<NodePatch> = parse_items(self.name(), payload)?;
        if let Err(e) = self.service.notify_members(&patches) {
            warn!(error = %e, "member payload apply failed; tree left stale");
        }
        Ok(())
    }

    fn remove_id(&self, id: NodeId) {
        if let Err(e) = self
            .service
            .store()
            .apply(ContentArea::Members, &[NodePatch::remove(id)])
        {
            warn!(error = %e, node = %id, "member removal failed");
        }
    }
}

/// Invalidates domain assignments and every route that embeds them.
///
/// Domain changes are rare and the entry set is small, so every
/// notification shape reloads the whole set rather than patching it.
pub struct DomainCacheRefresher {
    service: Arc<FacadeService>,
}

impl DomainCacheRefresher {
    /// Creates a domain refresher over `service`.
    #[must_use]
    pub fn new(service: Arc<FacadeService>) -> Self {
        Self { service }
    }
}

impl CacheRefresher for DomainCacheRefresher {
    fn id(&self) -> RefresherId {
        RefresherId::DOMAIN
    }

    fn name(&self) -> &str {
        "domain"
    }

    fn refresh_all(&self) {
        self.service.notify_domains();
    }

    fn refresh_id(&self, _id: NodeId) {
        self.service.notify_domains();
    }

    fn refresh_key(&self, _key: NodeKey) {
        self.service.notify_domains();
    }

    fn refresh_payload(&self, _payload: &str) -> SyncResult<()> {
        self.service.notify_domains();
        Ok(())
    }

    fn remove_id(&self, _id: NodeId) {
        self.service.notify_domains();
    }
}

/// Invalidates caches derived from content type definitions.
pub struct ContentTypeCacheRefresher {
    service: Arc<FacadeService>,
}

impl ContentTypeCacheRefresher {
    /// Creates a content-type refresher over `service`.
    #[must_use]
    pub fn new(service: Arc<FacadeService>) -> Self {
        Self { service }
    }
}

impl CacheRefresher for ContentTypeCacheRefresher {
    fn id(&self) -> RefresherId {
        RefresherId::CONTENT_TYPE
    }

    fn name(&self) -> &str {
        "content type"
    }

    fn refresh_all(&self) {
        self.service.routes().clear();
    }

    fn refresh_id(&self, _id: NodeId) {
        // Type ids do not map onto tree nodes; invalidation is coarse.
        self.service.routes().clear();
    }

    fn refresh_key(&self, _key: NodeKey) {
        self.service.routes().clear();
    }

    fn refresh_payload(&self, payload: &str) -> SyncResult<()> {
        let changes: Vec<TypeChange> = parse_items(self.name(), payload)?;
        self.service.notify_content_types(&changes);
        Ok(())
    }

    fn remove_id(&self, _id: NodeId) {
        self.service.routes().clear();
    }
}

/// Handles data type change notifications.
///
/// Nothing in the core caches depends on data type definitions; the
/// refresher exists so changes still fan out to peers whose rendering
/// layers hook the notification.
pub struct DataTypeCacheRefresher {
    service: Arc<FacadeService>,
}

impl DataTypeCacheRefresher {
    /// Creates a data-type refresher over `service`.
    #[must_use]
    pub fn new(service: Arc<FacadeService>) -> Self {
        Self { service }
    }
}

impl CacheRefresher for DataTypeCacheRefresher {
    fn id(&self) -> RefresherId {
        RefresherId::DATA_TYPE
    }

    fn name(&self) -> &str {
        "data type"
    }

    fn refresh_all(&self) {}

    fn refresh_id(&self, _id: NodeId) {}

    fn refresh_key(&self, _key: NodeKey) {}

    fn refresh_payload(&self, payload: &str) -> SyncResult<()> {
        let changes: Vec<TypeChange> = parse_items(self.name(), payload)?;
        self.service.notify_data_types(&changes);
        Ok(())
    }

    fn remove_id(&self, _id: NodeId) {}
}

/// Registers the standard refresher set against one facade service.
///
/// # Errors
///
/// Returns [`crate::FacadeError::Sync`] if any of the well-known ids is
/// already taken.
pub fn register_all(
    registry: &mut RefresherRegistry,
    service: &Arc<FacadeService>,
) -> FacadeResult<()> {
    registry.register(Arc::new(ContentCacheRefresher::new(service.clone())))?;
    registry.register(Arc::new(MediaCacheRefresher::new(service.clone())))?;
    registry.register(Arc::new(MemberCacheRefresher::new(service.clone())))?;
    registry.register(Arc::new(DomainCacheRefresher::new(service.clone())))?;
    registry.register(Arc::new(ContentTypeCacheRefresher::new(service.clone())))?;
    registry.register(Arc::new(DataTypeCacheRefresher::new(service.clone())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::DomainEntry;
    use canopy_store::{DomainSource, NodeRecord, StoreResult, TreeSource};
    use pretty_assertions::assert_eq;

    struct FixtureSource;

    impl TreeSource for FixtureSource {
        fn load_tree(&self, area: ContentArea) -> StoreResult<Vec<NodeRecord>> {
            if area != ContentArea::Content {
                return Ok(Vec::new());
            }
            Ok(vec![
                record(1, -1, 1, "home"),
                record(2, 1, 2, "news"),
                record(3, 1, 2, "about"),
            ])
        }

        fn load_node(&self, area: ContentArea, id: NodeId) -> StoreResult<Option<NodeRecord>> {
            Ok(self.load_tree(area)?.into_iter().find(|r| r.id == id))
        }

        fn load_node_by_key(
            &self,
            area: ContentArea,
            key: NodeKey,
        ) -> StoreResult<Option<NodeRecord>> {
            Ok(self.load_tree(area)?.into_iter().find(|r| r.key == key))
        }

        fn load_draft_branch(&self, _root: NodeId) -> StoreResult<Vec<NodeRecord>> {
            Ok(Vec::new())
        }
    }

    struct NoDomains;

    impl DomainSource for NoDomains {
        fn load_domains(&self) -> StoreResult<Vec<DomainEntry>> {
            Ok(Vec::new())
        }
    }

    fn record(id: i32, parent: i32, level: u32, segment: &str) -> NodeRecord {
        NodeRecord {
            id: NodeId::new(id),
            key: NodeKey::new(uuid::Uuid::from_u128(id as u128)),
            parent_id: NodeId::new(parent),
            level,
            sort_order: id,
            content_type_id: 1,
            published: true,
            url_segment: segment.to_string(),
            properties: Default::default(),
        }
    }

    fn service() -> Arc<FacadeService> {
        let service = Arc::new(FacadeService::new(
            Arc::new(FixtureSource),
            Arc::new(NoDomains),
            crate::PreviewConfig::default(),
        ));
        service.store().rebuild_all().unwrap();
        service
    }

    #[test]
    fn register_all_installs_six_refreshers() {
        let mut registry = RefresherRegistry::new();
        register_all(&mut registry, &service()).unwrap();
        for id in [
            RefresherId::CONTENT,
            RefresherId::MEDIA,
            RefresherId::MEMBER,
            RefresherId::DOMAIN,
            RefresherId::CONTENT_TYPE,
            RefresherId::DATA_TYPE,
        ] {
            assert!(registry.resolve(id).is_ok());
        }
    }

    #[test]
    fn register_all_twice_is_an_error() {
        let mut registry = RefresherRegistry::new();
        let service = service();
        register_all(&mut registry, &service).unwrap();
        let err = register_all(&mut registry, &service).unwrap_err();
        assert!(matches!(
            err,
            crate::FacadeError::Sync(SyncError::DuplicateRefresher(_))
        ));
    }

    #[test]
    fn content_remove_drops_node_and_route() {
        let service = service();
        let refresher = ContentCacheRefresher::new(service.clone());

        let facade = service.create_facade(None);
        assert_eq!(facade.content().route_for(NodeId::new(2)).unwrap(), "/news");
        assert_eq!(service.routes().len(), 1);

        refresher.remove_id(NodeId::new(2));
        assert_eq!(service.routes().len(), 0);
        assert!(service
            .store()
            .current(ContentArea::Content)
            .node(NodeId::new(2))
            .is_none());
    }

    #[test]
    fn content_refresh_id_restores_removed_node() {
        let service = service();
        let refresher = ContentCacheRefresher::new(service.clone());

        refresher.remove_id(NodeId::new(2));
        refresher.refresh_id(NodeId::new(2));
        assert!(service
            .store()
            .current(ContentArea::Content)
            .node(NodeId::new(2))
            .is_some());
    }

    #[test]
    fn content_refresh_key_pulls_node_missing_from_snapshot() {
        let service = service();
        let refresher = ContentCacheRefresher::new(service.clone());
        let key = NodeKey::new(uuid::Uuid::from_u128(2));

        refresher.remove_id(NodeId::new(2));
        assert!(service
            .store()
            .current(ContentArea::Content)
            .node_by_key(key)
            .is_none());

        refresher.refresh_key(key);
        let snapshot = service.store().current(ContentArea::Content);
        assert_eq!(snapshot.node_by_key(key).unwrap().id, NodeId::new(2));
    }

    #[test]
    fn content_payload_rejects_garbage() {
        let refresher = ContentCacheRefresher::new(service());
        let err = refresher.refresh_payload("not json").unwrap_err();
        assert!(matches!(err, SyncError::MalformedPayload { .. }));
    }

    #[test]
    fn content_payload_applies_patches() {
        let service = service();
        let refresher = ContentCacheRefresher::new(service.clone());

        let patches = vec![NodePatch::upsert(NodeId::new(4), NodeId::new(1), 2)
            .url_segment("blog")
            .published(true)];
        let payload = serde_json::to_string(&patches).unwrap();
        refresher.refresh_payload(&payload).unwrap();

        let snapshot = service.store().current(ContentArea::Content);
        assert_eq!(snapshot.node(NodeId::new(4)).unwrap().url_segment, "blog");
    }

    #[test]
    fn malformed_item_is_skipped_rest_of_batch_applies() {
        let service = service();
        let refresher = ContentCacheRefresher::new(service.clone());

        let good = NodePatch::upsert(NodeId::new(5), NodeId::new(1), 2)
            .url_segment("events")
            .published(true);
        let payload = format!(
            r#"[{{"bogus": true}}, {}]"#,
            serde_json::to_string(&good).unwrap()
        );
        refresher.refresh_payload(&payload).unwrap();

        let snapshot = service.store().current(ContentArea::Content);
        assert!(snapshot.contains(NodeId::new(5)));
    }

    #[test]
    fn content_type_payload_clears_routes_for_content_kinds_only() {
        let service = service();
        let refresher = ContentTypeCacheRefresher::new(service.clone());
        service.create_facade(None).content().route_for(NodeId::new(2));
        assert_eq!(service.routes().len(), 1);

        let media_only = serde_json::to_string(&[TypeChange {
            kind: crate::TypeKind::Media,
            id: 9,
        }])
        .unwrap();
        refresher.refresh_payload(&media_only).unwrap();
        assert_eq!(service.routes().len(), 1);

        let content = serde_json::to_string(&[TypeChange {
            kind: crate::TypeKind::Content,
            id: 9,
        }])
        .unwrap();
        refresher.refresh_payload(&content).unwrap();
        assert_eq!(service.routes().len(), 0);
    }

    #[test]
    fn domain_refresher_clears_routes() {
        let service = service();
        let refresher = DomainCacheRefresher::new(service.clone());
        service.create_facade(None).content().route_for(NodeId::new(2));
        assert_eq!(service.routes().len(), 1);

        refresher.refresh_all();
        assert_eq!(service.routes().len(), 0);
    }
}
