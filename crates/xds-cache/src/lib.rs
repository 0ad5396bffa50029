//! # xds-cache
//!
//! Snapshots and the serving cache they are published into.
//!
//! - [`Snapshot`] - Immutable, versioned collection of resources for a node
//! - [`Snapshot::consistent`] - Cross-collection reference check run before publication
//! - [`ShardedCache`] - DashMap-based cache that validates snapshots on the way in
//!
//! ## Key Design Decisions
//!
//! - Snapshots are immutable and replaced wholesale, never patched
//! - The cache refuses structurally invalid or stale snapshots instead of
//!   serving them
//! - Updates are announced on a `tokio::sync::watch` channel so readiness can
//!   be awaited without polling
//!
//! ## Example
//!
//! ```rust,ignore
//! use xds_cache::{Cache, ShardedCache, Snapshot};
//! use xds_core::NodeHash;
//!
//! let cache = ShardedCache::new();
//! let snapshot = Snapshot::builder()
//!     .version("0.0")
//!     .resources(TypeUrl::ENDPOINT, endpoints)
//!     .resources(TypeUrl::CLUSTER, clusters)
//!     .resources(TypeUrl::ROUTE, routes)
//!     .resources(TypeUrl::LISTENER, listeners)
//!     .build();
//!
//! snapshot.consistent()?;
//! cache.set_snapshot(NodeHash::from_id("test-id"), snapshot)?;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod snapshot;
mod stats;


pub use cache::{Cache, ShardedCache, SnapshotUpdate};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotResources};
pub use stats::CacheStats;
