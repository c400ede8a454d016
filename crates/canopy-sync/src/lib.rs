//! # Canopy Sync
//!
//! Distributed cache invalidation for the Canopy content cache.
//!
//! An edit committed on one server of a load-balanced farm must
//! invalidate the matching in-memory caches on every peer. This crate
//! provides the pieces that make that happen:
//!
//! - [`CacheRefresher`] — a pluggable handler, identified by a stable
//!   UUID, that knows how to invalidate one category of local cache
//! - [`RefresherRegistry`] — maps refresher ids to handlers, built once
//!   at startup
//! - [`InvalidationMessage`] — the typed payload fanned out to peers
//! - [`DistributedCache`] — the gateway that validates a request,
//!   resolves the refresher and hands delivery to the messenger
//! - [`ServerRegistry`] / [`Messenger`] — collaborator traits for peer
//!   discovery and transport, so delivery mechanics stay swappable
//!
//! The gateway is local-first and eventually consistent: local caches
//! are mutated before fan-out, and a failed delivery leaves a peer
//! stale until the next rebuild rather than rolling anything back.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod gateway;
pub mod message;
pub mod messenger;
pub mod refresher;
pub mod registry;

pub use error::{SyncError, SyncResult};
pub use gateway::DistributedCache;
pub use message::{InvalidationMessage, MessageKind};
pub use messenger::{LocalMessenger, Messenger, ServerRegistry, StaticServerRegistry};
pub use refresher::{CacheRefresher, RefresherId};
pub use registry::RefresherRegistry;
