//! Service model → Envoy resources.
//!
//! [`ResourceGenerator::generate`] is a pure function of its configuration
//! and the model: no clock, no randomness, ordered maps throughout. Two calls
//! with equal models return equal resource sets.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use xds_core::{BoxResource, TypeUrl, XdsError, XdsResult};
use xds_registry::{Service, ServiceModel};
use xds_types::base::{Address, ConfigSource, Metadata};
use xds_types::cluster::{
    Cluster, DiscoveryType, EdsClusterConfig, LbPolicy, LbSubsetConfig, LbSubsetFallbackPolicy,
    LbSubsetSelector,
};
use xds_types::endpoint::{ClusterLoadAssignment, Endpoint, LbEndpoint, LocalityLbEndpoints};
use xds_types::filters::header_to_metadata::{self, KeyValuePair, Rule, ValueType};
use xds_types::filters::{
    CodecType, HttpConnectionManager, HttpFilter, Rds, HTTP_CONNECTION_MANAGER,
};
use xds_types::listener::{Filter, FilterChain, Listener};
use xds_types::route::{Route, RouteAction, RouteConfiguration, RouteMatch, VirtualHost};

/// Literals baked into every generated resource set.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Name of the single route table.
    pub route_name: String,
    /// Name of the virtual host inside the route table.
    pub virtual_host: String,
    /// Path prefix the route matches.
    pub route_prefix: String,
    /// Host header written on forwarded requests.
    pub host_rewrite: String,
    /// Name of the single listener.
    pub listener_name: String,
    /// Bind address of the listener.
    pub listener_address: String,
    /// Bind port of the listener.
    pub listener_port: u16,
    /// Stat prefix of the HTTP connection manager.
    pub stat_prefix: String,
    /// Metadata key subsets are selected on.
    pub subset_key: String,
    /// Request header copied into `subset_key`.
    pub subset_header: String,
    /// Filter-metadata namespace endpoint metadata is written to.
    pub metadata_namespace: String,
    /// Subset used when a request selects none.
    pub default_subset: BTreeMap<String, String>,
    /// Connect timeout of every generated cluster.
    pub connect_timeout: Duration,
    /// Management cluster proxies fetch EDS and RDS from.
    pub xds_cluster: String,
    /// Service the route table targets. `None` picks the first by name.
    pub default_service: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            route_name: "service_route".to_string(),
            virtual_host: "local_service".to_string(),
            route_prefix: "/".to_string(),
            host_rewrite: "target".to_string(),
            listener_name: "listener_0".to_string(),
            listener_address: "0.0.0.0".to_string(),
            listener_port: 80,
            stat_prefix: "http".to_string(),
            subset_key: "slice".to_string(),
            subset_header: "x-slice".to_string(),
            metadata_namespace: "envoy.lb".to_string(),
            default_subset: BTreeMap::new(),
            connect_timeout: Duration::from_secs(5),
            xds_cluster: "xds_cluster".to_string(),
            default_service: None,
        }
    }
}

/// The four resource collections generated from one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResourceSet {
    /// One assignment per service.
    pub endpoints: Vec<ClusterLoadAssignment>,
    /// One EDS cluster per service.
    pub clusters: Vec<Cluster>,
    /// The route table.
    pub routes: Vec<RouteConfiguration>,
    /// The listener.
    pub listeners: Vec<Listener>,
}

impl GeneratedResourceSet {
    /// Total number of resources across all collections.
    pub fn len(&self) -> usize {
        self.endpoints.len() + self.clusters.len() + self.routes.len() + self.listeners.len()
    }

    /// Check whether every collection is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The collections as type-erased resources keyed by type URL, in
    /// dependency order.
    pub fn to_resources(&self) -> [(&'static str, Vec<BoxResource>); 4] {
        fn erase<T: xds_core::Resource + Clone + 'static>(items: &[T]) -> Vec<BoxResource> {
            items.iter().map(|item| Arc::new(item.clone()) as BoxResource).collect()
        }

        [
            (TypeUrl::ENDPOINT, erase(&self.endpoints)),
            (TypeUrl::CLUSTER, erase(&self.clusters)),
            (TypeUrl::ROUTE, erase(&self.routes)),
            (TypeUrl::LISTENER, erase(&self.listeners)),
        ]
    }
}

/// Translates a [`ServiceModel`] into a [`GeneratedResourceSet`].
#[derive(Debug, Clone, Default)]
pub struct ResourceGenerator {
    config: GeneratorConfig,
}

impl ResourceGenerator {
    /// Create a generator.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the resources for `model`.
    ///
    /// Fails with [`XdsError::EmptyModel`] when the model has no services, and
    /// with [`XdsError::Configuration`] when the configured default service
    /// is not part of the model. Nothing is returned on failure.
    pub fn generate(&self, model: &ServiceModel) -> XdsResult<GeneratedResourceSet> {
        let default = self.default_service(model)?;

        let (endpoints, clusters): (Vec<_>, Vec<_>) = model
            .services()
            .map(|service| (self.endpoints_for(service), self.cluster_for(service)))
            .unzip();

        Ok(GeneratedResourceSet {
            endpoints,
            clusters,
            routes: vec![self.route_to(default.name())],
            listeners: vec![self.listener()],
        })
    }

    fn default_service<'m>(&self, model: &'m ServiceModel) -> XdsResult<&'m Service> {
        if model.is_empty() {
            return Err(XdsError::EmptyModel);
        }
        match &self.config.default_service {
            Some(name) => model.get(name).ok_or_else(|| {
                XdsError::Configuration(format!(
                    "default service {name:?} is not in the service model"
                ))
            }),
            None => model.first().ok_or(XdsError::EmptyModel),
        }
    }

    fn endpoints_for(&self, service: &Service) -> ClusterLoadAssignment {
        let endpoints = service
            .endpoints()
            .iter()
            .map(|endpoint| LocalityLbEndpoints {
                lb_endpoints: vec![LbEndpoint {
                    endpoint: Endpoint {
                        address: Address::tcp(endpoint.address(), service.port()),
                    },
                    metadata: Metadata::with_namespace(
                        self.config.metadata_namespace.clone(),
                        endpoint.metadata().clone(),
                    ),
                }],
            })
            .collect();

        ClusterLoadAssignment {
            cluster_name: service.name().to_string(),
            endpoints,
        }
    }

    fn cluster_for(&self, service: &Service) -> Cluster {
        Cluster {
            name: service.name().to_string(),
            connect_timeout: self.config.connect_timeout,
            discovery_type: DiscoveryType::Eds,
            lb_policy: LbPolicy::RoundRobin,
            eds_cluster_config: Some(EdsClusterConfig {
                eds_config: ConfigSource::grpc(self.config.xds_cluster.clone()),
                service_name: String::new(),
            }),
            lb_subset_config: Some(LbSubsetConfig {
                fallback_policy: LbSubsetFallbackPolicy::NoFallback,
                default_subset: self.config.default_subset.clone(),
                subset_selectors: vec![LbSubsetSelector {
                    keys: vec![self.config.subset_key.clone()],
                }],
            }),
        }
    }

    fn route_to(&self, cluster: &str) -> RouteConfiguration {
        RouteConfiguration {
            name: self.config.route_name.clone(),
            virtual_hosts: vec![VirtualHost {
                name: self.config.virtual_host.clone(),
                domains: vec!["*".to_string()],
                routes: vec![Route {
                    route_match: RouteMatch {
                        prefix: self.config.route_prefix.clone(),
                    },
                    action: RouteAction {
                        cluster: cluster.to_string(),
                        host_rewrite_literal: Some(self.config.host_rewrite.clone()),
                    },
                }],
            }],
        }
    }

    fn listener(&self) -> Listener {
        let subset_rule = Rule {
            header: self.config.subset_header.clone(),
            on_header_present: KeyValuePair {
                metadata_namespace: self.config.metadata_namespace.clone(),
                key: self.config.subset_key.clone(),
                value_type: ValueType::String,
            },
            remove: false,
        };

        // Metadata must be populated before the router picks a subset.
        let manager = HttpConnectionManager {
            codec_type: CodecType::Auto,
            stat_prefix: self.config.stat_prefix.clone(),
            rds: Rds {
                config_source: ConfigSource::grpc(self.config.xds_cluster.clone()),
                route_config_name: self.config.route_name.clone(),
            },
            http_filters: vec![
                HttpFilter::header_to_metadata(header_to_metadata::Config {
                    request_rules: vec![subset_rule],
                }),
                HttpFilter::router(),
            ],
        };

        Listener {
            name: self.config.listener_name.clone(),
            address: Address::tcp(self.config.listener_address.clone(), self.config.listener_port),
            filter_chains: vec![FilterChain {
                filters: vec![Filter {
                    name: HTTP_CONNECTION_MANAGER.to_string(),
                    typed_config: manager,
                }],
            }],
        }
    }
}
