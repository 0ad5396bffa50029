//! Command-line configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use subset_xds::core::{XdsError, XdsResult};
use subset_xds::pipeline::{ControlPlaneConfig, GeneratorConfig};
use subset_xds::registry::{parse_server, DnsConfig, PollerConfig};

/// Subset-routing xDS control plane
#[derive(Parser, Debug)]
#[command(name = "control-plane")]
#[command(
    about = "Polls a service registry and serves subset-routing xDS snapshots",
    long_about = None
)]
pub struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// xDS management server port
    #[arg(long, default_value_t = 1800)]
    pub port: u16,

    /// Node ID the snapshots are registered for
    #[arg(long, alias = "nodeID", default_value = "test-id")]
    pub node_id: String,

    /// DNS server for registry lookups (`ip` or `ip:port`); host resolution when unset
    #[arg(long, env = "DNS")]
    pub dns: Option<String>,

    /// Seconds between registry polls
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,

    /// Service the default route targets; first service by name when unset
    #[arg(long)]
    pub default_service: Option<String>,
}

impl Args {
    /// Pipeline configuration for these flags.
    pub fn control_plane_config(&self) -> XdsResult<ControlPlaneConfig> {
        if self.poll_interval == 0 {
            return Err(XdsError::Configuration("--poll-interval must be at least 1".to_string()));
        }
        Ok(ControlPlaneConfig {
            node_id: self.node_id.clone(),
            poller: PollerConfig {
                interval: Duration::from_secs(self.poll_interval),
                ..PollerConfig::default()
            },
            generator: GeneratorConfig {
                default_service: self.default_service.clone(),
                ..GeneratorConfig::default()
            },
        })
    }

    /// Resolver configuration for these flags.
    pub fn dns_config(&self) -> XdsResult<DnsConfig> {
        let server: Option<SocketAddr> = match self.dns.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => Some(parse_server(value)?),
            _ => None,
        };
        Ok(DnsConfig {
            server,
            ..DnsConfig::default()
        })
    }
}
