//! Periodic registry polling.
//!
//! [`RegistryPoller`] turns the answer of a [`Resolver`] into a fresh
//! [`ServiceModel`] on every tick and hands it to a [`ModelHandler`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use xds_core::{XdsError, XdsResult};

use crate::model::{Service, ServiceEndpoint, ServiceModel};
use crate::resolver::Resolver;

/// Metadata key carrying the endpoint's ordinal host label.
pub const HOST_KEY: &str = "host";
/// Metadata key carrying the endpoint's routing group.
pub const GROUP_KEY: &str = "group";

/// Poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Symbolic name resolved on every tick.
    pub target: String,
    /// Time between ticks.
    pub interval: Duration,
    /// Name of the service the resolved addresses belong to.
    pub service_name: String,
    /// Port shared by all resolved endpoints.
    pub port: u16,
    /// Group labels assigned round-robin in address order.
    pub groups: Vec<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            target: "target".to_string(),
            interval: Duration::from_secs(5),
            service_name: "service1".to_string(),
            port: 8000,
            groups: vec!["a".to_string(), "b".to_string()],
        }
    }
}

/// Receives every model the poller produces.
///
/// Each call completes before the next tick is taken. An error stops the
/// poller and is returned from [`RegistryPoller::run`].
#[async_trait]
pub trait ModelHandler: Send {
    /// Handle one freshly built model.
    async fn on_model(&mut self, model: ServiceModel) -> XdsResult<()>;
}

/// Polls a [`Resolver`] on a fixed cadence.
#[derive(Clone)]
pub struct RegistryPoller {
    resolver: Arc<dyn Resolver>,
    config: PollerConfig,
}

impl std::fmt::Debug for RegistryPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryPoller").field("config", &self.config).finish()
    }
}

impl RegistryPoller {
    /// Create a poller.
    ///
    /// Fails with [`XdsError::Configuration`] for a zero interval, and with
    /// [`XdsError::InvalidService`] when the service settings are invalid.
    pub fn new(resolver: Arc<dyn Resolver>, config: PollerConfig) -> XdsResult<Self> {
        if config.interval.is_zero() {
            return Err(XdsError::Configuration("poll interval must be positive".to_string()));
        }
        if config.groups.is_empty() {
            return Err(XdsError::Configuration("at least one group label is required".to_string()));
        }
        // Surface a bad name or port now rather than on the first tick.
        Service::new(config.service_name.clone(), config.port, [])?;
        Ok(Self { resolver, config })
    }

    /// The active configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Resolve the target once and build the resulting model.
    pub async fn poll_once(&self) -> XdsResult<ServiceModel> {
        let addresses = self.resolver.resolve(&self.config.target).await?;

        let endpoints = addresses.into_iter().enumerate().map(|(i, address)| {
            let group = &self.config.groups[i % self.config.groups.len()];
            ServiceEndpoint::new(address)
                .with_metadata(HOST_KEY, format!("target-{}", i + 1))
                .with_metadata(GROUP_KEY, group.clone())
        });

        let service = Service::new(self.config.service_name.clone(), self.config.port, endpoints)?;
        Ok(ServiceModel::single(service))
    }

    /// Poll until `shutdown` completes or the handler fails.
    ///
    /// The first tick fires immediately. A tick whose resolution fails is
    /// logged and skipped. Ticks never overlap: when the handler is slow the
    /// next tick is delayed rather than bunched up.
    pub async fn run<H, S>(&self, on_model: &mut H, shutdown: S) -> XdsResult<()>
    where
        H: ModelHandler + ?Sized,
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            target_name = %self.config.target,
            interval = ?self.config.interval,
            "registry poller started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("registry poller stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let model = match self.poll_once().await {
                Ok(model) => model,
                Err(e) if e.is_transient() => {
                    warn!(target_name = %self.config.target, error = %e, "skipping poll");
                    continue;
                }
                Err(e) => return Err(e),
            };

            debug!(services = model.len(), "polled service model");
            on_model.on_model(model).await?;
        }
    }
}
