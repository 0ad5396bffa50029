//! Name resolution for registry targets.
//!
//! [`Resolver`] is the seam between the poller and whatever knows where the
//! backends are. [`DnsResolver`] asks DNS, either through the host's own
//! configuration or through an explicitly configured server;
//! [`StaticResolver`] answers from a fixed table.

use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{
    NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts,
};
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, trace};
use xds_core::{XdsError, XdsResult};

/// Environment variable naming an explicit DNS server.
pub const DNS_ENV: &str = "DNS";

const DEFAULT_DNS_PORT: u16 = 53;

/// Resolves a symbolic target to the addresses currently behind it.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `name`.
    ///
    /// Fails with [`XdsError::Resolution`] when nothing is found, and with
    /// [`XdsError::Timeout`] when the lookup does not finish in time.
    async fn resolve(&self, name: &str) -> XdsResult<BTreeSet<String>>;
}

/// DNS resolver configuration.
#[derive(Debug, Clone)]
pub struct DnsConfig {
    /// Server every query is sent to. `None` uses the host's resolver.
    pub server: Option<SocketAddr>,
    /// Upper bound on a single lookup.
    pub timeout: Duration,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            server: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl DnsConfig {
    /// Use `server` for every query.
    #[must_use]
    pub fn with_server(mut self, server: SocketAddr) -> Self {
        self.server = Some(server);
        self
    }

    /// Read the server override from the `DNS` environment variable.
    ///
    /// Unset or empty means host resolution.
    pub fn from_env() -> XdsResult<Self> {
        match std::env::var(DNS_ENV) {
            Ok(value) if !value.trim().is_empty() => {
                Ok(Self::default().with_server(parse_server(&value)?))
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Parse `ip` or `ip:port`; a bare address gets port 53.
pub fn parse_server(value: &str) -> XdsResult<SocketAddr> {
    let value = value.trim();
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    value
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
        .map_err(|_| XdsError::Configuration(format!("invalid DNS server address {value:?}")))
}

/// Resolver backed by DNS.
///
/// Without a server override, lookups go through the operating system like
/// any other `getaddrinfo` call. With an override, a dedicated
/// `hickory-resolver` instance sends every query to that server over TCP.
pub struct DnsResolver {
    config: DnsConfig,
    custom: Option<TokioAsyncResolver>,
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver").field("config", &self.config).finish()
    }
}

impl DnsResolver {
    /// Create a resolver from explicit configuration.
    pub fn new(config: DnsConfig) -> Self {
        let custom = config.server.map(|server| {
            let mut name_servers = NameServerConfigGroup::with_capacity(1);
            name_servers.push(NameServerConfig::new(server, Protocol::Tcp));

            let mut opts = ResolverOpts::default();
            opts.timeout = config.timeout;
            opts.attempts = 1;

            TokioAsyncResolver::tokio(ResolverConfig::from_parts(None, vec![], name_servers), opts)
        });
        Self { config, custom }
    }

    /// Create a resolver configured from the `DNS` environment variable.
    pub fn from_env() -> XdsResult<Self> {
        DnsConfig::from_env().map(Self::new)
    }

    /// The active configuration.
    pub fn config(&self) -> &DnsConfig {
        &self.config
    }

    async fn lookup(&self, name: &str) -> XdsResult<Vec<IpAddr>> {
        match &self.custom {
            Some(resolver) => {
                let lookup = resolver
                    .lookup_ip(name)
                    .await
                    .map_err(|e| XdsError::resolution(name, "dns query failed", e))?;
                Ok(lookup.iter().collect())
            }
            None => {
                let addrs = tokio::net::lookup_host((name, 0))
                    .await
                    .map_err(|e| XdsError::resolution(name, "host lookup failed", e))?;
                Ok(addrs.map(|addr| addr.ip()).collect())
            }
        }
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, name: &str) -> XdsResult<BTreeSet<String>> {
        trace!(target_name = name, server = ?self.config.server, "resolving");

        let ips = tokio::time::timeout(self.config.timeout, self.lookup(name))
            .await
            .map_err(|_| XdsError::Timeout {
                operation: format!("resolve {name}"),
            })??;

        let addresses: BTreeSet<String> = ips.into_iter().map(|ip| ip.to_string()).collect();
        if addresses.is_empty() {
            return Err(XdsError::no_addresses(name));
        }

        debug!(target_name = name, count = addresses.len(), "resolved");
        Ok(addresses)
    }
}

/// Resolver answering from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl StaticResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `addresses` for `name`, replacing earlier entries.
    #[must_use]
    pub fn with(
        mut self,
        name: impl Into<String>,
        addresses: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.entries
            .insert(name.into(), addresses.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, name: &str) -> XdsResult<BTreeSet<String>> {
        match self.entries.get(name) {
            Some(addresses) if !addresses.is_empty() => Ok(addresses.clone()),
            _ => Err(XdsError::no_addresses(name)),
        }
    }
}
