//! Graceful shutdown for the pipeline's background tasks.
//!
//! The poller and the snapshot applier both watch a [`ShutdownSignal`] and
//! stop between ticks/consumes. Applying a snapshot to the cache registers an
//! operation, so [`ShutdownController::shutdown`] can wait for an in-flight
//! apply to finish.
//!
//! # Example
//!
//! ```rust,ignore
//! use xds_pipeline::ShutdownController;
//! use std::time::Duration;
//!
//! let controller = ShutdownController::new();
//! let signal = controller.shutdown_signal();
//!
//! tokio::spawn(async move {
//!     signal.wait().await;
//!     // stop work
//! });
//!
//! controller.shutdown(Duration::from_secs(5)).await;
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

/// Coordinates shutdown across tasks.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    /// Whether shutdown has been initiated.
    initiated: AtomicBool,
    /// Sender for shutdown signal.
    tx: watch::Sender<bool>,
    /// Operations that must finish before shutdown completes.
    active_ops: AtomicUsize,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Create a new shutdown controller.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ShutdownInner {
                initiated: AtomicBool::new(false),
                tx,
                active_ops: AtomicUsize::new(0),
            }),
        }
    }

    /// Check if shutdown has been initiated.
    pub fn is_shutdown(&self) -> bool {
        self.inner.initiated.load(Ordering::SeqCst)
    }

    /// Get a future-producing handle that resolves when shutdown is initiated.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.inner.tx.subscribe(),
        }
    }

    /// Signal every task to stop without waiting for them.
    ///
    /// Returns `false` when shutdown had already been initiated.
    pub fn trigger(&self) -> bool {
        if self
            .inner
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.inner.tx.send_replace(true);
        true
    }

    /// Signal every task to stop and wait for in-flight operations.
    ///
    /// Returns `true` if all operations completed within `grace_period`.
    pub async fn shutdown(&self, grace_period: Duration) -> bool {
        if self.trigger() {
            info!(grace_period = ?grace_period, "initiating graceful shutdown");
        }

        match timeout(grace_period, self.wait_for_completion()).await {
            Ok(()) => {
                info!("graceful shutdown completed");
                true
            }
            Err(_) => {
                warn!(
                    remaining_ops = self.active_operations(),
                    "graceful shutdown timed out"
                );
                false
            }
        }
    }

    async fn wait_for_completion(&self) {
        while self.active_operations() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Register an operation shutdown should wait for.
    ///
    /// The operation ends when the returned guard is dropped.
    pub fn register_operation(&self) -> OperationGuard {
        self.inner.active_ops.fetch_add(1, Ordering::SeqCst);
        OperationGuard {
            controller: self.clone(),
        }
    }

    /// Get the number of active operations.
    pub fn active_operations(&self) -> usize {
        self.inner.active_ops.load(Ordering::SeqCst)
    }
}

/// Marks an operation as in flight until dropped.
#[derive(Debug)]
pub struct OperationGuard {
    controller: ShutdownController,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.controller.inner.active_ops.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Resolves when shutdown is initiated.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for the shutdown signal.
    ///
    /// A dropped controller counts as shutdown.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|initiated| *initiated).await;
    }
}
