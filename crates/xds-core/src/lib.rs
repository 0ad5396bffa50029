//! # xds-core
//!
//! Core types, traits, and error handling shared by the snapshot pipeline.
//!
//! This crate provides the foundational types used across all other crates:
//!
//! - [`XdsError`] - Error type covering resolution, generation, versioning and publication
//! - [`ResourceVersion`] - Sequence-derived version labels (`"{sequence}.0"`)
//! - [`NodeHash`] - Efficient node identification using FNV-1a hashing
//! - [`Resource`] - Trait implemented by every generated xDS resource
//! - [`TypeUrl`] - Type URL handling and constants
//!
//! ## Example
//!
//! ```rust
//! use xds_core::{NodeHash, ResourceVersion};
//!
//! // Snapshots are registered per node
//! let node = NodeHash::from_id("test-id");
//!
//! // The first snapshot produced for a node carries version "0.0"
//! let version = ResourceVersion::from_sequence(0);
//! assert_eq!(version.as_str(), "0.0");
//! assert_eq!(version.sequence(), Some(0));
//! # let _ = node;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod node;
mod resource;
mod type_url;
mod version;

pub use error::XdsError;
pub use node::NodeHash;
pub use resource::{BoxResource, Resource, ResourceRef};
pub use type_url::TypeUrl;
pub use version::ResourceVersion;

/// Result type alias using [`XdsError`].
pub type Result<T> = std::result::Result<T, XdsError>;

/// Alias for Result used throughout the workspace.
pub type XdsResult<T> = Result<T>;
