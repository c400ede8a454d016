//! The snapshot store: copy-on-write trees with atomic publish.

use crate::patch::{BuildStats, NodePatch, SnapshotBuilder};
use crate::rows::{NodeRow, RowTable};
use crate::snapshot::ContentSnapshot;
use crate::source::{NodeRecord, TreeSource};
use crate::StoreResult;
use canopy_core::{ContentArea, NodeId, NodeKey};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

fn record_patch(record: NodeRecord) -> NodePatch {
    NodePatch {
        id: record.id,
        key: record.key,
        parent_id: record.parent_id,
        level: record.level,
        sort_order: record.sort_order,
        content_type_id: record.content_type_id,
        published: record.published,
        url_segment: record.url_segment,
        properties: record.properties,
        removed: false,
    }
}

struct AreaSlot {
    snapshot: RwLock<Arc<ContentSnapshot>>,
    // Serializes writers per area; readers never take it. Without it
    // two concurrent builds would start from the same base and the
    // later swap would discard the earlier batch.
    mutate: Mutex<()>,
}

impl AreaSlot {
    fn empty(area: ContentArea) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(ContentSnapshot::empty(area))),
            mutate: Mutex::new(()),
        }
    }
}

/// Holds the current snapshot of every content area.
///
/// Mutation is copy-on-write whole-document swap: [`TreeStore::apply`]
/// and [`TreeStore::rebuild`] construct a replacement snapshot off to
/// the side and publish it atomically. Writers are serialized per area
/// so no batch is lost; readers obtain their own
/// `Arc<ContentSnapshot>` via [`TreeStore::current`] and one in flight
/// at swap time simply keeps the snapshot it started with.
///
/// The store also mirrors the content area into a [`RowTable`] of
/// serialized node rows — the persisted layout — stamping each write
/// with a monotonically increasing revision counter.
pub struct TreeStore {
    source: Arc<dyn TreeSource>,
    content: AreaSlot,
    media: AreaSlot,
    members: AreaSlot,
    rows: RowTable,
    rv: AtomicI64,
}

impl TreeStore {
    /// Creates a store with empty snapshots; call
    /// [`TreeStore::rebuild_all`] to load from the source.
    #[must_use]
    pub fn new(source: Arc<dyn TreeSource>) -> Self {
        Self {
            source,
            content: AreaSlot::empty(ContentArea::Content),
            media: AreaSlot::empty(ContentArea::Media),
            members: AreaSlot::empty(ContentArea::Members),
            rows: RowTable::new(),
            rv: AtomicI64::new(0),
        }
    }

    fn slot(&self, area: ContentArea) -> &AreaSlot {
        match area {
            ContentArea::Content => &self.content,
            ContentArea::Media => &self.media,
            ContentArea::Members => &self.members,
        }
    }

    /// Returns the current snapshot of an area.
    ///
    /// The returned `Arc` stays valid across later swaps; hold it for
    /// the duration of one logical read operation.
    #[must_use]
    pub fn current(&self, area: ContentArea) -> Arc<ContentSnapshot> {
        self.slot(area).snapshot.read().clone()
    }

    /// Applies a batch of incremental patches to an area.
    ///
    /// The replacement snapshot is built from the current one and
    /// swapped in atomically; patches whose parent is not yet visible
    /// are deferred, not errors. Concurrent calls for the same area are
    /// serialized.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Row`] if the row mirror cannot
    /// serialize a node.
    pub fn apply(&self, area: ContentArea, patches: &[NodePatch]) -> StoreResult<BuildStats> {
        let slot = self.slot(area);
        let _mutation = slot.mutate.lock();

        let base = slot.snapshot.read().clone();
        let mut builder = SnapshotBuilder::new((*base).clone());
        builder.apply(patches);
        let (snapshot, stats) = builder.build();

        self.mirror_rows(area, &snapshot, patches)?;

        debug!(%area, applied = stats.applied, removed = stats.removed, deferred = stats.deferred, "applied patch batch");
        *slot.snapshot.write() = Arc::new(snapshot);
        Ok(stats)
    }

    /// Rebuilds one area from the tree source.
    ///
    /// Rebuilds are segmented by area so corruption in one tree never
    /// forces reloading the others.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when the source cannot be
    /// read, or [`crate::StoreError::Row`] from the row mirror.
    pub fn rebuild(&self, area: ContentArea) -> StoreResult<BuildStats> {
        let slot = self.slot(area);
        let _mutation = slot.mutate.lock();

        let records = self.source.load_tree(area)?;
        let patches: Vec<NodePatch> = records.into_iter().map(record_patch).collect();

        let mut builder = SnapshotBuilder::new(ContentSnapshot::empty(area));
        builder.apply(&patches);
        let (snapshot, stats) = builder.build();

        self.mirror_rows(area, &snapshot, &patches)?;
        if area == ContentArea::Content {
            // A rebuild is authoritative: rows for nodes that vanished
            // upstream since the last pass must go, and no removal
            // patch exists to name them.
            self.rows.retain(|id| snapshot.contains(id));
        }

        info!(%area, nodes = snapshot.len(), deferred = stats.deferred, "rebuilt snapshot from source");
        *slot.snapshot.write() = Arc::new(snapshot);
        Ok(stats)
    }

    /// Re-reads one node from the source and patches it into an area.
    ///
    /// A node that is gone upstream, or unpublished in the content
    /// area, is removed from the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when the source cannot be
    /// read, or [`crate::StoreError::Row`] from the row mirror.
    pub fn refresh_node(&self, area: ContentArea, id: NodeId) -> StoreResult<BuildStats> {
        let patch = match self.source.load_node(area, id)? {
            Some(record) if record.published || area != ContentArea::Content => {
                record_patch(record)
            }
            _ => NodePatch::remove(id),
        };
        self.apply(area, &[patch])
    }

    /// Re-reads one node from the source by GUID and patches it into an
    /// area.
    ///
    /// Works even when the node has never been in the local snapshot; a
    /// key unknown both upstream and locally is a no-op, and a nil key
    /// is always a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when the source cannot be
    /// read, or [`crate::StoreError::Row`] from the row mirror.
    pub fn refresh_node_by_key(
        &self,
        area: ContentArea,
        key: NodeKey,
    ) -> StoreResult<BuildStats> {
        if key.is_nil() {
            return Ok(BuildStats::default());
        }
        let patch = match self.source.load_node_by_key(area, key)? {
            Some(record) if record.published || area != ContentArea::Content => {
                record_patch(record)
            }
            Some(record) => NodePatch::remove(record.id),
            None => match self.current(area).node_by_key(key) {
                Some(node) => NodePatch::remove(node.id),
                None => return Ok(BuildStats::default()),
            },
        };
        self.apply(area, &[patch])
    }

    /// Rebuilds every area.
    ///
    /// # Errors
    ///
    /// Returns the first per-area error encountered.
    pub fn rebuild_all(&self) -> StoreResult<()> {
        for area in ContentArea::ALL {
            self.rebuild(area)?;
        }
        Ok(())
    }

    /// Checks the structural invariants of an area's current snapshot.
    #[must_use]
    pub fn verify(&self, area: ContentArea) -> bool {
        self.current(area).verify()
    }

    /// Builds a standalone snapshot of the draft subtree under `root`.
    ///
    /// The branch root is re-rooted (its parent lies outside the
    /// branch) and levels are normalized so the branch forms a valid
    /// snapshot of its own. Used to seed preview branches.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when the source cannot be
    /// read.
    pub fn draft_branch(&self, root: NodeId) -> StoreResult<ContentSnapshot> {
        let records = self.source.load_draft_branch(root)?;
        let offset = records
            .iter()
            .find(|r| r.id == root)
            .map_or(0, |r| r.level.saturating_sub(1));

        let patches: Vec<NodePatch> = records
            .into_iter()
            .map(|mut record| {
                if record.id == root {
                    record.parent_id = NodeId::ROOT_PARENT;
                }
                record.level = record.level.saturating_sub(offset);
                record_patch(record)
            })
            .collect();

        let mut builder = SnapshotBuilder::new(ContentSnapshot::empty(ContentArea::Content));
        builder.apply(&patches);
        Ok(builder.build().0)
    }

    /// The row mirror of the content area, i.e. the persisted layout.
    #[must_use]
    pub fn rows(&self) -> &RowTable {
        &self.rows
    }

    /// Keeps the serialized-row mirror of the content area in step with
    /// a freshly built snapshot.
    fn mirror_rows(
        &self,
        area: ContentArea,
        snapshot: &ContentSnapshot,
        patches: &[NodePatch],
    ) -> StoreResult<()> {
        if area != ContentArea::Content {
            return Ok(());
        }
        for patch in patches {
            if patch.removed {
                self.rows.remove(patch.id);
            } else if let Some(node) = snapshot.node(patch.id) {
                let rv = self.rv.fetch_add(1, Ordering::Relaxed) + 1;
                self.rows.upsert(NodeRow::from_node(node, rv)?);
            }
        }
        if patches.iter().any(|p| p.removed) {
            // A removal prunes the whole subtree; descendants have no
            // patch of their own but their rows must go too.
            self.rows.retain(|id| snapshot.contains(id));
        }
        Ok(())
    }
}
