//! Supervisor wiring the pipeline together.
//!
//! ```text
//! Resolver → RegistryPoller → ResourceGenerator → SnapshotVersioner
//!                                                       │ publish
//!                                                       ▼
//!                       Cache ◄── applier task ◄── SnapshotChannel
//! ```
//!
//! [`ControlPlane::start`] spawns the poller, waits for the first snapshot
//! and applies it, then spawns the applier for every later one. Any fatal
//! error in either task ends [`RunningControlPlane::wait`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use xds_cache::{Cache, Snapshot};
use xds_core::{NodeHash, XdsError, XdsResult};
use xds_registry::{ModelHandler, PollerConfig, RegistryPoller, Resolver, ServiceModel};

use crate::channel::{snapshot_channel, SnapshotReceiver, SnapshotSender};
use crate::generator::{GeneratorConfig, ResourceGenerator};
use crate::shutdown::{ShutdownController, ShutdownSignal};
use crate::versioner::SnapshotVersioner;

const POLLER_TASK: &str = "registry-poller";
const APPLIER_TASK: &str = "snapshot-applier";

/// Everything needed to run the pipeline for one node.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// Node the snapshots are registered for.
    pub node_id: String,
    /// Registry polling settings.
    pub poller: PollerConfig,
    /// Resource generation settings.
    pub generator: GeneratorConfig,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            node_id: "test-id".to_string(),
            poller: PollerConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

/// The pipeline before it starts.
pub struct ControlPlane {
    config: ControlPlaneConfig,
    resolver: Arc<dyn Resolver>,
    cache: Arc<dyn Cache>,
}

impl std::fmt::Debug for ControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlane").field("config", &self.config).finish()
    }
}

impl ControlPlane {
    /// Create a control plane publishing into `cache`.
    pub fn new(
        config: ControlPlaneConfig,
        resolver: Arc<dyn Resolver>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            config,
            resolver,
            cache,
        }
    }

    /// Start polling and return once the first snapshot has been applied.
    ///
    /// Fails with the first fatal error hit before that point. Transient
    /// resolution failures are retried on the poll cadence, so this waits
    /// for as long as the registry stays unreachable.
    pub async fn start(self) -> XdsResult<RunningControlPlane> {
        let node = NodeHash::from_id(&self.config.node_id);
        let poller = RegistryPoller::new(self.resolver, self.config.poller)?;
        let shutdown = ShutdownController::new();
        let (sender, mut receiver) = snapshot_channel();

        let mut tasks = JoinSet::new();
        let mut publisher = Publisher {
            generator: ResourceGenerator::new(self.config.generator),
            versioner: SnapshotVersioner::new(),
            sender,
            shutdown: shutdown.clone(),
        };
        let signal = shutdown.shutdown_signal();
        tasks.spawn(async move {
            let result = poller.run(&mut publisher, signal.wait()).await;
            (POLLER_TASK, result)
        });

        info!(node_id = %self.config.node_id, node = %node, "waiting for first snapshot");

        let Some(first) = receiver.consume().await else {
            // The poller exits before publishing only on error.
            shutdown.trigger();
            return Err(first_error(&mut tasks).await.unwrap_or(XdsError::ChannelClosed));
        };

        if let Err(e) = apply(self.cache.as_ref(), node, first) {
            shutdown.trigger();
            tasks.shutdown().await;
            return Err(e);
        }

        tasks.spawn(run_applier(
            Arc::clone(&self.cache),
            node,
            receiver,
            shutdown.clone(),
            shutdown.shutdown_signal(),
        ));

        Ok(RunningControlPlane {
            node,
            cache: self.cache,
            shutdown,
            tasks,
        })
    }
}

/// A started pipeline.
pub struct RunningControlPlane {
    node: NodeHash,
    cache: Arc<dyn Cache>,
    shutdown: ShutdownController,
    tasks: JoinSet<(&'static str, XdsResult<()>)>,
}

impl std::fmt::Debug for RunningControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningControlPlane")
            .field("node", &self.node)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl RunningControlPlane {
    /// Node the snapshots are registered for.
    pub fn node(&self) -> NodeHash {
        self.node
    }

    /// The cache snapshots are applied to.
    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Handle for stopping the background tasks.
    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// Wait for both background tasks to finish.
    ///
    /// Returns the first fatal error; the other task is told to stop as soon
    /// as one fails. Returns `Ok(())` after a clean shutdown.
    pub async fn wait(mut self) -> XdsResult<()> {
        let mut outcome = Ok(());
        while let Some(result) = next_result(&mut self.tasks).await {
            if let Err(e) = result {
                if outcome.is_ok() {
                    self.shutdown.trigger();
                    outcome = Err(e);
                } else {
                    debug!(error = %e, "error after first failure");
                }
            }
        }
        outcome
    }

    /// Initiate shutdown, give an in-flight apply `grace_period` to finish,
    /// then wait for both tasks.
    pub async fn stop(self, grace_period: Duration) -> XdsResult<()> {
        self.shutdown.shutdown(grace_period).await;
        self.wait().await
    }
}

/// Turns polled models into published snapshots.
struct Publisher {
    generator: ResourceGenerator,
    versioner: SnapshotVersioner,
    sender: SnapshotSender,
    shutdown: ShutdownController,
}

#[async_trait]
impl ModelHandler for Publisher {
    async fn on_model(&mut self, model: ServiceModel) -> XdsResult<()> {
        let set = self.generator.generate(&model).map_err(|e| {
            error!(error = %e, model = ?model, "resource generation failed");
            e
        })?;
        let snapshot = self.versioner.next_snapshot(&set)?;

        debug!(version = %snapshot.version(), "will serve snapshot");
        match self.sender.publish(snapshot).await {
            // The applier stops first on shutdown.
            Err(XdsError::ChannelClosed) if self.shutdown.is_shutdown() => Ok(()),
            other => other,
        }
    }
}

fn apply(cache: &dyn Cache, node: NodeHash, snapshot: Snapshot) -> XdsResult<()> {
    let version = snapshot.version().to_string();
    match cache.set_snapshot(node, snapshot.clone()) {
        Ok(()) => {
            info!(node = %node, version = %version, "applied snapshot");
            Ok(())
        }
        Err(e) => {
            error!(
                node = %node,
                version = %version,
                error = %e,
                snapshot = ?snapshot,
                "snapshot error"
            );
            Err(e)
        }
    }
}

async fn run_applier(
    cache: Arc<dyn Cache>,
    node: NodeHash,
    mut receiver: SnapshotReceiver,
    shutdown: ShutdownController,
    signal: ShutdownSignal,
) -> (&'static str, XdsResult<()>) {
    let signal = signal.wait();
    tokio::pin!(signal);

    let result = loop {
        tokio::select! {
            biased;
            _ = &mut signal => break Ok(()),
            next = receiver.consume() => {
                let Some(snapshot) = next else {
                    break Ok(());
                };
                let _op = shutdown.register_operation();
                if let Err(e) = apply(cache.as_ref(), node, snapshot) {
                    break Err(e);
                }
            }
        }
    };

    debug!("snapshot applier stopped");
    (APPLIER_TASK, result)
}

async fn next_result(tasks: &mut JoinSet<(&'static str, XdsResult<()>)>) -> Option<XdsResult<()>> {
    let joined = tasks.join_next().await?;
    Some(match joined {
        Ok((task, Ok(()))) => {
            debug!(task, "task finished");
            Ok(())
        }
        Ok((task, Err(e))) => {
            error!(task, error = %e, "task failed");
            Err(e)
        }
        Err(e) => Err(XdsError::TaskFailed {
            task: "control-plane".to_string(),
            message: e.to_string(),
        }),
    })
}

async fn first_error(tasks: &mut JoinSet<(&'static str, XdsResult<()>)>) -> Option<XdsError> {
    let mut first = None;
    while let Some(result) = next_result(tasks).await {
        if let (None, Err(e)) = (&first, result) {
            first = Some(e);
        }
    }
    first
}
