//! Single-slot snapshot handoff.
//!
//! The channel holds at most one unconsumed snapshot. A producer publishing
//! while the slot is full waits until the consumer takes the pending one, so
//! snapshots are neither dropped nor reordered and a slow cache slows the
//! poller down instead of piling up memory.

use tokio::sync::mpsc;
use tracing::trace;
use xds_cache::Snapshot;
use xds_core::{XdsError, XdsResult};

/// Create a connected sender/receiver pair with capacity 1.
pub fn snapshot_channel() -> (SnapshotSender, SnapshotReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (SnapshotSender { tx }, SnapshotReceiver { rx })
}

/// Producing half of the snapshot channel.
#[derive(Debug, Clone)]
pub struct SnapshotSender {
    tx: mpsc::Sender<Snapshot>,
}

impl SnapshotSender {
    /// Publish a snapshot, waiting while the slot is occupied.
    ///
    /// Fails with [`XdsError::ChannelClosed`] once the receiver is gone.
    pub async fn publish(&self, snapshot: Snapshot) -> XdsResult<()> {
        trace!(version = %snapshot.version(), "publishing snapshot");
        self.tx.send(snapshot).await.map_err(|_| XdsError::ChannelClosed)
    }

    /// Publish without waiting.
    ///
    /// Fails with [`XdsError::ChannelFull`] when a snapshot is still pending.
    pub fn try_publish(&self, snapshot: Snapshot) -> XdsResult<()> {
        self.tx.try_send(snapshot).map_err(|e| match e {
            mpsc::error::TrySendError::Full(snapshot) => XdsError::ChannelFull {
                pending: snapshot.version().to_string(),
            },
            mpsc::error::TrySendError::Closed(_) => XdsError::ChannelClosed,
        })
    }

    /// Check whether the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consuming half of the snapshot channel.
#[derive(Debug)]
pub struct SnapshotReceiver {
    rx: mpsc::Receiver<Snapshot>,
}

impl SnapshotReceiver {
    /// Take the next snapshot, waiting until one is published.
    ///
    /// Returns `None` once every sender is gone and the slot is empty.
    pub async fn consume(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }
}
