//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache operations.
///
/// All counters are atomic and can be safely accessed from multiple threads.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of snapshots accepted.
    snapshots_set: AtomicU64,
    /// Number of snapshots refused by validation.
    snapshots_rejected: AtomicU64,
    /// Number of snapshot gets (hits).
    snapshot_hits: AtomicU64,
    /// Number of snapshot gets (misses).
    snapshot_misses: AtomicU64,
    /// Number of snapshot clears.
    snapshots_cleared: AtomicU64,
}

impl CacheStats {
    /// Create new cache statistics.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_set(&self) {
        self.snapshots_set.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rejection(&self) {
        self.snapshots_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_hit(&self) {
        self.snapshot_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.snapshot_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_clear(&self) {
        self.snapshots_cleared.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total snapshots accepted.
    #[inline]
    pub fn snapshots_set(&self) -> u64 {
        self.snapshots_set.load(Ordering::Relaxed)
    }

    /// Get total snapshots rejected.
    #[inline]
    pub fn snapshots_rejected(&self) -> u64 {
        self.snapshots_rejected.load(Ordering::Relaxed)
    }

    /// Get total snapshot hits.
    #[inline]
    pub fn snapshot_hits(&self) -> u64 {
        self.snapshot_hits.load(Ordering::Relaxed)
    }

    /// Get total snapshot misses.
    #[inline]
    pub fn snapshot_misses(&self) -> u64 {
        self.snapshot_misses.load(Ordering::Relaxed)
    }

    /// Get total snapshots cleared.
    #[inline]
    pub fn snapshots_cleared(&self) -> u64 {
        self.snapshots_cleared.load(Ordering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.snapshot_hits() as f64;
        let total = hits + self.snapshot_misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }
}
