//! Cache trait and ShardedCache implementation.
//!
//! The cache stores snapshots keyed by node hash. The [`ShardedCache`]
//! implementation uses `DashMap` for concurrent access and validates every
//! snapshot before it replaces the one being served.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, trace, warn};
use xds_core::{NodeHash, ResourceVersion, TypeUrl, XdsError, XdsResult};

use crate::snapshot::Snapshot;
use crate::stats::CacheStats;

/// Trait for xDS snapshot caches.
///
/// Provides the interface for storing and retrieving snapshots.
pub trait Cache: Send + Sync {
    /// Get a snapshot for a node.
    fn get_snapshot(&self, node: NodeHash) -> Option<Arc<Snapshot>>;

    /// Set a snapshot for a node.
    ///
    /// Fails with [`XdsError::SnapshotRejected`] when the snapshot does not
    /// pass validation; the previously served snapshot stays in place.
    fn set_snapshot(&self, node: NodeHash, snapshot: Snapshot) -> XdsResult<()>;

    /// Clear the snapshot for a node.
    fn clear_snapshot(&self, node: NodeHash);

    /// Get the number of cached snapshots.
    fn snapshot_count(&self) -> usize;
}

/// Announcement of the most recently applied snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotUpdate {
    /// Node the snapshot was applied for.
    pub node: NodeHash,
    /// Version label of the applied snapshot.
    pub version: ResourceVersion,
}

/// A sharded cache using DashMap.
///
/// This cache implementation:
/// - Uses `DashMap` for concurrent reads
/// - Refuses snapshots that are incomplete, inconsistent or stale
/// - Publishes the latest applied version on a `watch` channel
///
/// ## Important
///
/// All `DashMap` references are dropped before the update is announced so
/// subscribers never observe a version whose snapshot is not yet readable.
#[derive(Debug)]
pub struct ShardedCache {
    /// Snapshots keyed by node hash.
    snapshots: DashMap<NodeHash, Arc<Snapshot>>,
    /// Latest applied snapshot.
    updates: watch::Sender<Option<SnapshotUpdate>>,
    /// Statistics.
    stats: CacheStats,
}

impl Default for ShardedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardedCache {
    /// Create a new sharded cache with default settings.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a new sharded cache with a specific initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            snapshots: DashMap::with_capacity(capacity),
            updates,
            stats: CacheStats::new(),
        }
    }

    /// Get cache statistics.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Subscribe to applied snapshots.
    ///
    /// The receiver starts at the most recent update (or `None` when nothing
    /// has been applied yet); intermediate updates may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<Option<SnapshotUpdate>> {
        self.updates.subscribe()
    }

    /// Get all node hashes in the cache.
    pub fn nodes(&self) -> Vec<NodeHash> {
        self.snapshots.iter().map(|r| *r.key()).collect()
    }

    /// Check if a snapshot exists for a node.
    pub fn has_snapshot(&self, node: NodeHash) -> bool {
        self.snapshots.contains_key(&node)
    }

    fn validate(snapshot: &Snapshot) -> Result<(), String> {
        if snapshot.resource_version().is_empty() {
            return Err("version label is empty".to_string());
        }

        for type_url in TypeUrl::CORE {
            if !snapshot.contains_type(type_url) {
                return Err(format!("missing {} collection", TypeUrl::new(type_url).short_name()));
            }
        }

        for type_url in snapshot.type_urls() {
            let Some(collection) = snapshot.get_resources(type_url.as_str()) else {
                continue;
            };
            for (name, resource) in collection.iter() {
                if name.is_empty() {
                    return Err(format!("unnamed resource in {}", type_url.short_name()));
                }
                if resource.type_url() != type_url.as_str() {
                    return Err(format!(
                        "resource {name:?} of type {} stored under {}",
                        resource.type_url(),
                        type_url
                    ));
                }
            }
        }

        snapshot.consistent().map_err(|e| e.to_string())
    }

    fn reject(&self, node: NodeHash, snapshot: &Snapshot, reason: String) -> XdsError {
        self.stats.record_rejection();
        warn!(node = %node, version = %snapshot.version(), %reason, "rejected snapshot");
        XdsError::SnapshotRejected {
            node: node.to_string(),
            version: snapshot.version().to_string(),
            reason,
        }
    }
}

/// Sequenced labels must advance; unsequenced labels are only required to be
/// non-empty.
fn check_advance(current: &Snapshot, next: &Snapshot) -> Result<(), String> {
    let previous = current.resource_version();
    match (previous.sequence(), next.resource_version().sequence()) {
        (Some(prev), Some(seq)) if seq <= prev => Err(format!(
            "version {} does not advance past {}",
            next.version(),
            previous
        )),
        _ => Ok(()),
    }
}

impl Cache for ShardedCache {
    fn get_snapshot(&self, node: NodeHash) -> Option<Arc<Snapshot>> {
        // DashMap::get returns a Ref that holds a read lock.
        // We clone the Arc and drop the Ref immediately.
        let result = self.snapshots.get(&node).map(|r| Arc::clone(&*r));

        if result.is_some() {
            self.stats.record_hit();
            trace!(node = %node, "cache hit");
        } else {
            self.stats.record_miss();
            trace!(node = %node, "cache miss");
        }

        result
    }

    fn set_snapshot(&self, node: NodeHash, snapshot: Snapshot) -> XdsResult<()> {
        if let Err(reason) = Self::validate(&snapshot) {
            return Err(self.reject(node, &snapshot, reason));
        }

        let version = snapshot.resource_version().clone();
        let resources = snapshot.total_resources();

        // The advance check and the replacement happen under the same shard
        // lock, so concurrent writers cannot move a node backwards.
        match self.snapshots.entry(node) {
            Entry::Occupied(mut current) => {
                if let Err(reason) = check_advance(current.get(), &snapshot) {
                    drop(current);
                    return Err(self.reject(node, &snapshot, reason));
                }
                current.insert(Arc::new(snapshot));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(snapshot));
            }
        }
        self.stats.record_set();

        debug!(node = %node, version = %version, resources, "set snapshot");

        // A writer that lost the race to announce must not roll subscribers back.
        self.updates.send_if_modified(|latest| {
            let superseded = latest.as_ref().is_some_and(|update| {
                update.node == node && update.version.sequence() > version.sequence()
            });
            if !superseded {
                *latest = Some(SnapshotUpdate { node, version });
            }
            !superseded
        });
        Ok(())
    }

    fn clear_snapshot(&self, node: NodeHash) {
        if self.snapshots.remove(&node).is_some() {
            self.stats.record_clear();
            debug!(node = %node, "cleared snapshot");
        }
    }

    fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }
}
