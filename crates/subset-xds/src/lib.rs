//! # subset-xds
//!
//! Control-plane pipeline that keeps Envoy's subset load balancer fed.
//!
//! A registry is polled on a fixed cadence, each poll is translated into
//! endpoints, clusters, a route table and a listener, the result is
//! versioned and checked for consistency, and a single-slot channel hands it
//! to the serving cache. Requests carrying an `x-slice` header are then
//! routed to the endpoints whose `slice` metadata matches.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use subset_xds::prelude::*;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(ShardedCache::new());
//! let resolver = Arc::new(DnsResolver::from_env()?);
//!
//! let running = ControlPlane::new(ControlPlaneConfig::default(), resolver, cache.clone())
//!     .start()
//!     .await?;
//!
//! // The first snapshot is already being served.
//! assert!(cache.get_snapshot(running.node()).is_some());
//! running.wait().await?;
//! ```
//!
//! ## Architecture
//!
//! - `xds-core` - Errors, node hashing, the `Resource` trait, type URLs and versions
//! - `xds-types` - Envoy resource shapes
//! - `xds-cache` - Snapshots, the consistency check and the serving cache
//! - `xds-registry` - Service model, resolvers and the registry poller
//! - `xds-pipeline` - Generation, versioning, the snapshot channel and the supervisor
//!
//! This crate re-exports all public APIs for convenience.
//!
//! ## Design Principles
//!
//! 1. **No panics in library code** - All errors are returned as `Result`
//! 2. **No partial snapshots** - A set that fails generation or the consistency
//!    check is never published
//! 3. **Back-pressure over buffering** - A slow cache delays the poller instead
//!    of queueing snapshots

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub use xds_cache as cache;
pub use xds_core as core;
pub use xds_pipeline as pipeline;
pub use xds_registry as registry;
pub use xds_types as types;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use subset_xds::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use xds_core::{
        BoxResource, NodeHash, Resource, ResourceVersion, TypeUrl, XdsError, XdsResult,
    };

    // Cache types
    pub use xds_cache::{Cache, CacheStats, ShardedCache, Snapshot, SnapshotBuilder, SnapshotUpdate};

    // Registry types
    pub use xds_registry::{
        DnsConfig, DnsResolver, PollerConfig, RegistryPoller, Resolver, Service, ServiceEndpoint,
        ServiceModel, StaticResolver,
    };

    // Pipeline types
    pub use xds_pipeline::{
        snapshot_channel, ControlPlane, ControlPlaneConfig, GeneratedResourceSet, GeneratorConfig,
        ResourceGenerator, RunningControlPlane, ShutdownController, SnapshotVersioner,
    };
}

/// Version information for this crate.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Minimum supported Rust version.
    pub const MSRV: &str = "1.75";

    /// Get version info as a string.
    pub fn version_string() -> String {
        format!("subset-xds {} (MSRV {})", VERSION, MSRV)
    }
}
