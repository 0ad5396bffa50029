//! # xds-pipeline
//!
//! Turns service models into versioned, consistent snapshots and hands them
//! to a cache.
//!
//! - [`ResourceGenerator`] - Pure model → endpoints/clusters/routes/listeners translation
//! - [`SnapshotVersioner`] - `{sequence}.0` labels and the consistency gate
//! - [`snapshot_channel`] - Capacity-1 handoff with back-pressure
//! - [`ControlPlane`] - Supervisor running the poller and the cache applier
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xds_cache::ShardedCache;
//! use xds_pipeline::{ControlPlane, ControlPlaneConfig};
//! use xds_registry::DnsResolver;
//!
//! let cache = Arc::new(ShardedCache::new());
//! let resolver = Arc::new(DnsResolver::from_env()?);
//!
//! let running = ControlPlane::new(ControlPlaneConfig::default(), resolver, cache)
//!     .start()
//!     .await?;
//! running.wait().await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod control_plane;
mod generator;
mod shutdown;
mod versioner;

pub use channel::{snapshot_channel, SnapshotReceiver, SnapshotSender};
pub use control_plane::{ControlPlane, ControlPlaneConfig, RunningControlPlane};
pub use generator::{GeneratedResourceSet, GeneratorConfig, ResourceGenerator};
pub use shutdown::{OperationGuard, ShutdownController, ShutdownSignal};
pub use versioner::{version, SnapshotVersioner};
