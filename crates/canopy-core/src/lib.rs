//! # Canopy Core
//!
//! Core types for the Canopy published-content cache.
//!
//! This crate provides the foundational building blocks used throughout
//! the Canopy workspace:
//!
//! - Identifier types ([`NodeId`], [`NodeKey`], [`ServerAddress`])
//! - The content tree node model ([`ContentNode`], [`ContentArea`])
//! - Domain resolution entries ([`DomainEntry`])
//! - Timestamp type for preview expiry bookkeeping
//!
//! ## Example
//!
//! ```rust
//! use canopy_core::{ContentNode, NodeId};
//!
//! let root = ContentNode::new(NodeId::new(1000), NodeId::ROOT_PARENT, 1);
//! assert!(root.is_root());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod id;
pub mod node;
pub mod timestamp;

pub use domain::DomainEntry;
pub use id::{NodeId, NodeKey, ServerAddress};
pub use node::{ContentArea, ContentNode, Properties};
pub use timestamp::Timestamp;
