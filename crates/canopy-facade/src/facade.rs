//! The request-scoped read views.

use canopy_core::{ContentNode, DomainEntry, NodeId, NodeKey};
use canopy_store::{ContentSnapshot, RoutesCache};
use std::sync::Arc;

/// A read-only view over one area's snapshot (media, members).
#[derive(Clone)]
pub struct AreaView {
    snapshot: Arc<ContentSnapshot>,
}

impl AreaView {
    pub(crate) fn new(snapshot: Arc<ContentSnapshot>) -> Self {
        Self { snapshot }
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ContentNode> {
        self.snapshot.node(id)
    }

    /// Looks up a node by GUID.
    #[must_use]
    pub fn node_by_key(&self, key: NodeKey) -> Option<&ContentNode> {
        self.snapshot.node_by_key(key)
    }

    /// The children of a node, in sort order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<&ContentNode> {
        self.snapshot.children(id)
    }

    /// Root nodes of the area.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        self.snapshot.roots()
    }

    /// The underlying snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &Arc<ContentSnapshot> {
        &self.snapshot
    }
}

/// The domain entries frozen at facade construction.
#[derive(Clone)]
pub struct DomainView {
    entries: Arc<Vec<DomainEntry>>,
}

impl DomainView {
    pub(crate) fn new(entries: Arc<Vec<DomainEntry>>) -> Self {
        Self { entries }
    }

    /// All entries.
    #[must_use]
    pub fn all(&self) -> &[DomainEntry] {
        &self.entries
    }

    /// Resolves an authority (hostname, or hostname/path) to its
    /// domain entry; the most specific name wins.
    #[must_use]
    pub fn match_domain(&self, authority: &str) -> Option<&DomainEntry> {
        self.entries
            .iter()
            .filter(|d| d.matches(authority))
            .max_by_key(|d| d.name.len())
    }

    /// The non-wildcard domain assigned to a node, if any.
    #[must_use]
    pub fn domain_for_node(&self, content_id: NodeId) -> Option<&DomainEntry> {
        self.entries
            .iter()
            .find(|d| !d.is_wildcard && d.content_id == content_id)
    }
}

/// The content view: published tree, optionally shadowed by a preview
/// branch, with route resolution.
///
/// Routing always runs against the published snapshot — preview
/// branches are reached by token, not by URL.
#[derive(Clone)]
pub struct ContentView {
    published: Arc<ContentSnapshot>,
    branch: Option<Arc<ContentSnapshot>>,
    routes: Arc<RoutesCache>,
    domains: Arc<Vec<DomainEntry>>,
}

impl ContentView {
    pub(crate) fn new(
        published: Arc<ContentSnapshot>,
        branch: Option<Arc<ContentSnapshot>>,
        routes: Arc<RoutesCache>,
        domains: Arc<Vec<DomainEntry>>,
    ) -> Self {
        Self {
            published,
            branch,
            routes,
            domains,
        }
    }

    /// Returns true if this view is backed by a preview branch.
    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.branch.is_some()
    }

    /// Looks up a node: the preview branch shadows the published tree
    /// for the nodes it contains.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ContentNode> {
        if let Some(branch) = &self.branch {
            if let Some(node) = branch.node(id) {
                return Some(node);
            }
        }
        self.published.node(id)
    }

    /// Looks up a node by GUID, preview branch first.
    #[must_use]
    pub fn node_by_key(&self, key: NodeKey) -> Option<&ContentNode> {
        if let Some(branch) = &self.branch {
            if let Some(node) = branch.node_by_key(key) {
                return Some(node);
            }
        }
        self.published.node_by_key(key)
    }

    /// The children of a node; the preview branch wins for nodes it
    /// contains.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<&ContentNode> {
        if let Some(branch) = &self.branch {
            if branch.contains(id) {
                return branch.children(id);
            }
        }
        self.published.children(id)
    }

    /// Root nodes of the published tree.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        self.published.roots()
    }

    /// Resolves the route of a node, filling the routes cache lazily.
    ///
    /// Routes under a domain-bound ancestor are prefixed with that
    /// ancestor's id (`"{rootId}/path"`); routes without one are plain
    /// absolute paths. The root segment itself never appears in a
    /// route — a site root resolves to `/`.
    #[must_use]
    pub fn route_for(&self, id: NodeId) -> Option<String> {
        if let Some(route) = self.routes.get_route(id) {
            return Some(route);
        }

        let node = self.published.node(id)?;
        let mut chain = vec![node];
        let mut current = node;
        while !current.is_root() {
            current = self.published.node(current.parent_id)?;
            chain.push(current);
        }
        chain.reverse();

        // Deepest domain-bound ancestor wins.
        let domain_at = chain
            .iter()
            .rposition(|n| self.domains.iter().any(|d| !d.is_wildcard && d.content_id == n.id));

        let route = match domain_at {
            Some(i) => {
                let root_id = chain[i].id;
                let path: Vec<&str> = chain[i + 1..].iter().map(|n| n.url_segment.as_str()).collect();
                if path.is_empty() {
                    format!("{}/", root_id.as_i32())
                } else {
                    format!("{}/{}", root_id.as_i32(), path.join("/"))
                }
            }
            None => {
                let path: Vec<&str> = chain[1..].iter().map(|n| n.url_segment.as_str()).collect();
                format!("/{}", path.join("/"))
            }
        };

        self.routes.store(id, route.clone());
        Some(route)
    }

    /// Resolves a route back to its published node, filling the routes
    /// cache lazily.
    #[must_use]
    pub fn node_by_route(&self, route: &str) -> Option<&ContentNode> {
        if let Some(id) = self.routes.get_node_id(route) {
            if let Some(node) = self.published.node(id) {
                return Some(node);
            }
            // The cached entry outlived the node; drop it and recompute.
            self.routes.clear_node(id);
        }

        let (start, path) = match route.strip_prefix('/') {
            Some(rest) => (None, rest),
            None => {
                let mut parts = route.splitn(2, '/');
                let id = parts.next()?.parse::<i32>().ok()?;
                (Some(NodeId::new(id)), parts.next().unwrap_or(""))
            }
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let starts: Vec<NodeId> = match start {
            Some(id) => vec![id],
            None => self.published.roots().to_vec(),
        };

        'candidates: for start_id in starts {
            let mut current = match self.published.node(start_id) {
                Some(node) => node,
                None => continue,
            };
            for segment in &segments {
                match self
                    .published
                    .children(current.id)
                    .into_iter()
                    .find(|c| c.url_segment == *segment)
                {
                    Some(child) => current = child,
                    None => continue 'candidates,
                }
            }
            self.routes.store(current.id, route);
            return Some(current);
        }
        None
    }
}

/// An immutable, request-scoped composite view over all caches.
///
/// Built by [`crate::FacadeService::create_facade`]; construct a new
/// one per logical operation and let it go when done. Later edits
/// produce new facades, never mutate an existing one.
#[derive(Clone)]
pub struct Facade {
    content: ContentView,
    media: AreaView,
    members: AreaView,
    domains: DomainView,
}

impl Facade {
    pub(crate) fn new(
        content: ContentView,
        media: AreaView,
        members: AreaView,
        domains: DomainView,
    ) -> Self {
        Self {
            content,
            media,
            members,
            domains,
        }
    }

    /// The content view.
    #[must_use]
    pub fn content(&self) -> &ContentView {
        &self.content
    }

    /// The media view.
    #[must_use]
    pub fn media(&self) -> &AreaView {
        &self.media
    }

    /// The members view.
    #[must_use]
    pub fn members(&self) -> &AreaView {
        &self.members
    }

    /// The domain view.
    #[must_use]
    pub fn domains(&self) -> &DomainView {
        &self.domains
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::ContentArea;
    use canopy_store::{NodePatch, SnapshotBuilder};
    use pretty_assertions::assert_eq;

    fn published() -> Arc<ContentSnapshot> {
        let mut builder = SnapshotBuilder::new(ContentSnapshot::empty(ContentArea::Content));
        builder.apply(&[
            NodePatch::upsert(NodeId::new(1), NodeId::ROOT_PARENT, 1).url_segment("home"),
            NodePatch::upsert(NodeId::new(2), NodeId::new(1), 2).url_segment("news"),
            NodePatch::upsert(NodeId::new(3), NodeId::new(2), 3).url_segment("launch"),
            NodePatch::upsert(NodeId::new(4), NodeId::new(1), 2)
                .url_segment("da")
                .sort_order(1),
            NodePatch::upsert(NodeId::new(5), NodeId::new(4), 3).url_segment("nyheder"),
        ]);
        Arc::new(builder.build().0)
    }

    fn view(domains: Vec<DomainEntry>) -> ContentView {
        ContentView::new(
            published(),
            None,
            Arc::new(RoutesCache::new()),
            Arc::new(domains),
        )
    }

    #[test]
    fn route_without_domain() {
        let view = view(Vec::new());
        assert_eq!(view.route_for(NodeId::new(1)).unwrap(), "/");
        assert_eq!(view.route_for(NodeId::new(3)).unwrap(), "/news/launch");
    }

    #[test]
    fn route_under_domain_is_prefixed() {
        let view = view(vec![DomainEntry::new(
            1,
            "example.dk",
            NodeId::new(4),
            "da-DK",
        )]);
        assert_eq!(view.route_for(NodeId::new(4)).unwrap(), "4/");
        assert_eq!(view.route_for(NodeId::new(5)).unwrap(), "4/nyheder");
        // Nodes outside the domain subtree keep plain routes.
        assert_eq!(view.route_for(NodeId::new(3)).unwrap(), "/news/launch");
    }

    #[test]
    fn route_round_trips_through_lookup() {
        let view = view(Vec::new());
        let route = view.route_for(NodeId::new(3)).unwrap();
        assert_eq!(view.node_by_route(&route).unwrap().id, NodeId::new(3));

        // Both directions are now cached.
        let view2 = view.clone();
        assert_eq!(view2.node_by_route("/news/launch").unwrap().id, NodeId::new(3));
    }

    #[test]
    fn node_by_route_with_domain_prefix() {
        let view = view(vec![DomainEntry::new(
            1,
            "example.dk",
            NodeId::new(4),
            "da-DK",
        )]);
        assert_eq!(view.node_by_route("4/nyheder").unwrap().id, NodeId::new(5));
        assert_eq!(view.node_by_route("4/").unwrap().id, NodeId::new(4));
    }

    #[test]
    fn unknown_route_is_none() {
        let view = view(Vec::new());
        assert!(view.node_by_route("/no/such/page").is_none());
    }

    #[test]
    fn preview_branch_shadows_published() {
        let mut builder = SnapshotBuilder::new(ContentSnapshot::empty(ContentArea::Content));
        builder.apply(&[
            NodePatch::upsert(NodeId::new(2), NodeId::ROOT_PARENT, 1)
                .url_segment("news-draft")
                .published(false),
        ]);
        let branch = Arc::new(builder.build().0);

        let view = ContentView::new(
            published(),
            Some(branch),
            Arc::new(RoutesCache::new()),
            Arc::new(Vec::new()),
        );

        assert!(view.is_preview());
        // Node 2 comes from the branch, node 3 falls back to published.
        assert_eq!(view.node(NodeId::new(2)).unwrap().url_segment, "news-draft");
        assert_eq!(view.node(NodeId::new(3)).unwrap().url_segment, "launch");
    }

    #[test]
    fn domain_view_most_specific_wins() {
        let domains = DomainView::new(Arc::new(vec![
            DomainEntry::new(1, "example.com", NodeId::new(1), "en-US"),
            DomainEntry::new(2, "example.com/da", NodeId::new(4), "da-DK"),
        ]));

        assert_eq!(
            domains.match_domain("example.com/da/x").unwrap().content_id,
            NodeId::new(4)
        );
        assert_eq!(
            domains.match_domain("example.com/about").unwrap().content_id,
            NodeId::new(1)
        );
        assert!(domains.match_domain("other.org").is_none());
    }
}
