//! # Canopy Store
//!
//! The content snapshot store protected by the distributed cache.
//!
//! Each server holds one immutable [`ContentSnapshot`] per content area
//! (content, media, members). Mutation follows a copy-on-write
//! whole-document discipline: a rebuild or patch pass constructs a new
//! snapshot and atomically publishes it, so concurrent readers never
//! observe a partially-built tree — a reader in flight keeps the
//! snapshot it started with.
//!
//! Around the snapshots live two dependent caches:
//!
//! - [`RoutesCache`] — a bidirectional node-id ↔ URL-route index,
//!   filled lazily and cleared wholesale when anything affecting URL
//!   computation changes
//! - [`DomainCache`] — hostname/culture resolution entries, loaded on
//!   demand and invalidated wholesale
//!
//! The store is eventually consistent across the farm: patches are
//! idempotent, [`TreeStore::verify`] checks structural invariants, and
//! a segmented [`TreeStore::rebuild`] is the self-healing backstop.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domains;
pub mod error;
pub mod patch;
pub mod routes;
pub mod rows;
pub mod snapshot;
pub mod source;
pub mod store;

pub use domains::DomainCache;
pub use error::{StoreError, StoreResult};
pub use patch::{BuildStats, NodePatch, SnapshotBuilder};
pub use routes::RoutesCache;
pub use rows::{NodeRow, RowTable};
pub use snapshot::ContentSnapshot;
pub use source::{DomainSource, NodeRecord, TreeSource};
pub use store::TreeStore;
