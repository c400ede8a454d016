//! # Canopy Facade
//!
//! Read-only composition of the Canopy caches, one frozen view per
//! request, plus the preview overlay and the built-in cache refreshers.
//!
//! A [`Facade`] is constructed fresh for each logical operation from
//! whatever the snapshot store holds at that instant; once built it
//! never observes later mutations. Rendering code reads nodes, routes
//! and domains through it without taking locks.
//!
//! The [`PreviewOverlay`] keeps token-scoped shadow copies of draft
//! subtrees; a facade created with a valid preview token serves draft
//! content for the previewed branch and falls back to the published
//! snapshot everywhere else. Preview and published views never
//! cross-contaminate.
//!
//! [`refreshers::register_all`] wires the standard refresher set into a
//! [`canopy_sync::RefresherRegistry`] at startup, closing the loop from
//! the distributed cache gateway back into the local stores.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod facade;
pub mod preview;
pub mod refreshers;
pub mod service;

pub use error::{FacadeError, FacadeResult};
pub use facade::{AreaView, ContentView, DomainView, Facade};
pub use preview::{PreviewBranch, PreviewConfig, PreviewOverlay};
pub use refreshers::register_all;
pub use service::{ContentChanged, FacadeService, TypeChange, TypeKind};
