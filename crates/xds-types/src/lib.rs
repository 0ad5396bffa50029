//! # xds-types
//!
//! Envoy resource shapes emitted by the snapshot pipeline.
//!
//! The module tree mirrors the Envoy v3 API packages, trimmed to the fields
//! the generator fills in:
//!
//! - [`endpoint`] - `ClusterLoadAssignment` (EDS)
//! - [`cluster`] - `Cluster` with subset load-balancer config (CDS)
//! - [`route`] - `RouteConfiguration` (RDS)
//! - [`listener`] - `Listener` with an HTTP connection manager (LDS)
//! - [`filters`] - HTTP filter configs (header-to-metadata, router)
//!
//! Each top-level resource implements [`xds_core::Resource`]. Encoding wraps a
//! JSON rendering of the resource in a `prost_types::Any`. Field names and enum
//! spellings follow Envoy's proto3 JSON, but nested `typed_config` values are
//! an internal shape: they carry no `@type` and filter configs are tagged by
//! variant name (`{"header_to_metadata": {..}}`, `"router"`). The rendering is
//! not loadable by Envoy as-is.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]

use std::any::Any;

use serde::Serialize;
use xds_core::{Resource, ResourceRef, TypeUrl, XdsError, XdsResult};

pub mod base {
    //! Shared configuration types (`envoy.config.core.v3`).

    use std::collections::BTreeMap;

    use serde::Serialize;

    /// Transport protocol of a socket address.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum SocketProtocol {
        Tcp,
        Udp,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct SocketAddress {
        pub protocol: SocketProtocol,
        pub address: String,
        pub port_value: u32,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct Address {
        pub socket_address: SocketAddress,
    }

    impl Address {
        /// A TCP socket address.
        pub fn tcp(address: impl Into<String>, port: u16) -> Self {
            Self {
                socket_address: SocketAddress {
                    protocol: SocketProtocol::Tcp,
                    address: address.into(),
                    port_value: u32::from(port),
                },
            }
        }
    }

    /// Filter metadata: namespace → key → string value.
    ///
    /// Ordered maps keep the rendering stable across generations.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
    pub struct Metadata {
        pub filter_metadata: BTreeMap<String, BTreeMap<String, String>>,
    }

    impl Metadata {
        /// Metadata holding a single namespace.
        pub fn with_namespace(
            namespace: impl Into<String>,
            values: BTreeMap<String, String>,
        ) -> Self {
            let mut filter_metadata = BTreeMap::new();
            filter_metadata.insert(namespace.into(), values);
            Self { filter_metadata }
        }

        /// Look up a value under `namespace`.
        pub fn get(&self, namespace: &str, key: &str) -> Option<&str> {
            self.filter_metadata
                .get(namespace)
                .and_then(|values| values.get(key))
                .map(String::as_str)
        }

        /// All values under `namespace`.
        pub fn namespace(&self, namespace: &str) -> Option<&BTreeMap<String, String>> {
            self.filter_metadata.get(namespace)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ApiType {
        Grpc,
        DeltaGrpc,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ApiVersion {
        V3,
    }

    /// A gRPC service reached through an Envoy-managed cluster.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct GrpcService {
        pub envoy_grpc: EnvoyGrpc,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct EnvoyGrpc {
        pub cluster_name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct ApiConfigSource {
        pub api_type: ApiType,
        pub transport_api_version: ApiVersion,
        pub set_node_on_first_message_only: bool,
        pub grpc_services: Vec<GrpcService>,
    }

    /// Where a proxy fetches a dynamically discovered resource from.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct ConfigSource {
        pub resource_api_version: ApiVersion,
        pub api_config_source: ApiConfigSource,
    }

    impl ConfigSource {
        /// A v3 gRPC config source served by the management cluster `cluster_name`.
        pub fn grpc(cluster_name: impl Into<String>) -> Self {
            Self {
                resource_api_version: ApiVersion::V3,
                api_config_source: ApiConfigSource {
                    api_type: ApiType::Grpc,
                    transport_api_version: ApiVersion::V3,
                    set_node_on_first_message_only: true,
                    grpc_services: vec![GrpcService {
                        envoy_grpc: EnvoyGrpc {
                            cluster_name: cluster_name.into(),
                        },
                    }],
                },
            }
        }
    }
}

pub mod endpoint {
    //! Endpoint assignment types (`envoy.config.endpoint.v3`).

    use serde::Serialize;

    use crate::base::{Address, Metadata};

    /// The endpoints of one cluster.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct ClusterLoadAssignment {
        pub cluster_name: String,
        pub endpoints: Vec<LocalityLbEndpoints>,
    }

    impl ClusterLoadAssignment {
        /// Iterate over every endpoint across all locality groups.
        pub fn lb_endpoints(&self) -> impl Iterator<Item = &LbEndpoint> {
            self.endpoints.iter().flat_map(|locality| locality.lb_endpoints.iter())
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct LocalityLbEndpoints {
        pub lb_endpoints: Vec<LbEndpoint>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct LbEndpoint {
        pub endpoint: Endpoint,
        pub metadata: Metadata,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct Endpoint {
        pub address: Address,
    }
}

pub mod cluster {
    //! Cluster types (`envoy.config.cluster.v3`).

    use std::collections::BTreeMap;
    use std::time::Duration;

    use serde::{Serialize, Serializer};

    use crate::base::ConfigSource;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct Cluster {
        pub name: String,
        #[serde(serialize_with = "duration_seconds")]
        pub connect_timeout: Duration,
        #[serde(rename = "type")]
        pub discovery_type: DiscoveryType,
        pub lb_policy: LbPolicy,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub eds_cluster_config: Option<EdsClusterConfig>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub lb_subset_config: Option<LbSubsetConfig>,
    }

    impl Cluster {
        /// Name of the endpoint collection an EDS cluster resolves through.
        ///
        /// Envoy uses the cluster name when `service_name` is left empty.
        pub fn eds_service_name(&self) -> Option<&str> {
            if self.discovery_type != DiscoveryType::Eds {
                return None;
            }
            match &self.eds_cluster_config {
                Some(config) if !config.service_name.is_empty() => {
                    Some(config.service_name.as_str())
                }
                _ => Some(self.name.as_str()),
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum DiscoveryType {
        Static,
        StrictDns,
        LogicalDns,
        Eds,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum LbPolicy {
        RoundRobin,
        LeastRequest,
        Random,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct EdsClusterConfig {
        pub eds_config: ConfigSource,
        #[serde(skip_serializing_if = "String::is_empty")]
        pub service_name: String,
    }

    /// Subset load-balancer configuration.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct LbSubsetConfig {
        pub fallback_policy: LbSubsetFallbackPolicy,
        pub default_subset: BTreeMap<String, String>,
        pub subset_selectors: Vec<LbSubsetSelector>,
    }

    /// What happens when a request names a subset with no endpoints.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum LbSubsetFallbackPolicy {
        NoFallback,
        AnyEndpoint,
        DefaultSubset,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct LbSubsetSelector {
        pub keys: Vec<String>,
    }

    fn duration_seconds<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}s", duration.as_secs_f64()))
    }
}

pub mod route {
    //! Route configuration types (`envoy.config.route.v3`).

    use serde::Serialize;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct RouteConfiguration {
        pub name: String,
        pub virtual_hosts: Vec<VirtualHost>,
    }

    impl RouteConfiguration {
        /// Every cluster targeted by any route in this configuration.
        pub fn clusters(&self) -> impl Iterator<Item = &str> {
            self.virtual_hosts
                .iter()
                .flat_map(|vhost| vhost.routes.iter())
                .map(|route| route.action.cluster.as_str())
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct VirtualHost {
        pub name: String,
        pub domains: Vec<String>,
        pub routes: Vec<Route>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct Route {
        #[serde(rename = "match")]
        pub route_match: RouteMatch,
        #[serde(rename = "route")]
        pub action: RouteAction,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct RouteMatch {
        pub prefix: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct RouteAction {
        pub cluster: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub host_rewrite_literal: Option<String>,
    }
}

pub mod filters {
    //! HTTP filter configuration carried inside a listener.

    use serde::Serialize;

    use crate::base::ConfigSource;

    /// Well-known name of the header-to-metadata HTTP filter.
    pub const HEADER_TO_METADATA: &str = "envoy.filters.http.header_to_metadata";
    /// Well-known name of the router HTTP filter.
    pub const ROUTER: &str = "envoy.filters.http.router";
    /// Well-known name of the HTTP connection manager network filter.
    pub const HTTP_CONNECTION_MANAGER: &str = "envoy.filters.network.http_connection_manager";

    pub mod header_to_metadata {
        //! `envoy.extensions.filters.http.header_to_metadata.v3`

        use serde::Serialize;

        #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
        pub struct Config {
            pub request_rules: Vec<Rule>,
        }

        /// Copies a request header into dynamic metadata.
        #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
        pub struct Rule {
            pub header: String,
            pub on_header_present: KeyValuePair,
            pub remove: bool,
        }

        #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
        pub struct KeyValuePair {
            pub metadata_namespace: String,
            pub key: String,
            #[serde(rename = "type")]
            pub value_type: ValueType,
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum ValueType {
            String,
            Number,
            ProtobufValue,
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum CodecType {
        Auto,
        Http1,
        Http2,
    }

    /// `envoy.extensions.filters.network.http_connection_manager.v3`
    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct HttpConnectionManager {
        pub codec_type: CodecType,
        pub stat_prefix: String,
        pub rds: Rds,
        pub http_filters: Vec<HttpFilter>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct Rds {
        pub config_source: ConfigSource,
        pub route_config_name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct HttpFilter {
        pub name: String,
        pub typed_config: HttpFilterConfig,
    }

    impl HttpFilter {
        /// The header-to-metadata filter with the given config.
        pub fn header_to_metadata(config: header_to_metadata::Config) -> Self {
            Self {
                name: HEADER_TO_METADATA.to_string(),
                typed_config: HttpFilterConfig::HeaderToMetadata(config),
            }
        }

        /// The terminal router filter.
        pub fn router() -> Self {
            Self {
                name: ROUTER.to_string(),
                typed_config: HttpFilterConfig::Router,
            }
        }
    }

    /// Typed filter config, tagged by variant name rather than by `@type`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum HttpFilterConfig {
        HeaderToMetadata(header_to_metadata::Config),
        Router,
    }
}

pub mod listener {
    //! Listener types (`envoy.config.listener.v3`).

    use serde::Serialize;

    use crate::base::Address;
    use crate::filters::HttpConnectionManager;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct Listener {
        pub name: String,
        pub address: Address,
        pub filter_chains: Vec<FilterChain>,
    }

    impl Listener {
        /// Every HTTP connection manager across all filter chains.
        pub fn connection_managers(&self) -> impl Iterator<Item = &HttpConnectionManager> {
            self.filter_chains
                .iter()
                .flat_map(|chain| chain.filters.iter())
                .map(|filter| &filter.typed_config)
        }

        /// Route configurations this listener loads over RDS.
        pub fn route_names(&self) -> impl Iterator<Item = &str> {
            self.connection_managers()
                .map(|manager| manager.rds.route_config_name.as_str())
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct FilterChain {
        pub filters: Vec<Filter>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct Filter {
        pub name: String,
        pub typed_config: HttpConnectionManager,
    }
}

fn encode_json<T: Serialize>(
    type_url: &'static str,
    name: &str,
    value: &T,
) -> XdsResult<prost_types::Any> {
    let body = serde_json::to_vec(value).map_err(|e| XdsError::EncodingError {
        type_url: type_url.to_string(),
        name: name.to_string(),
        message: e.to_string(),
    })?;
    Ok(prost_types::Any {
        type_url: type_url.to_string(),
        value: body,
    })
}

impl Resource for endpoint::ClusterLoadAssignment {
    fn type_url(&self) -> &'static str {
        TypeUrl::ENDPOINT
    }

    fn name(&self) -> &str {
        &self.cluster_name
    }

    fn encode(&self) -> XdsResult<prost_types::Any> {
        encode_json(self.type_url(), self.name(), self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Resource for cluster::Cluster {
    fn type_url(&self) -> &'static str {
        TypeUrl::CLUSTER
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn references(&self) -> Vec<ResourceRef> {
        self.eds_service_name()
            .map(|service| ResourceRef::new(TypeUrl::ENDPOINT, service))
            .into_iter()
            .collect()
    }

    fn encode(&self) -> XdsResult<prost_types::Any> {
        encode_json(self.type_url(), self.name(), self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Resource for route::RouteConfiguration {
    fn type_url(&self) -> &'static str {
        TypeUrl::ROUTE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn references(&self) -> Vec<ResourceRef> {
        self.clusters()
            .map(|cluster| ResourceRef::new(TypeUrl::CLUSTER, cluster))
            .collect()
    }

    fn encode(&self) -> XdsResult<prost_types::Any> {
        encode_json(self.type_url(), self.name(), self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Resource for listener::Listener {
    fn type_url(&self) -> &'static str {
        TypeUrl::LISTENER
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn references(&self) -> Vec<ResourceRef> {
        self.route_names()
            .map(|route| ResourceRef::new(TypeUrl::ROUTE, route))
            .collect()
    }

    fn encode(&self) -> XdsResult<prost_types::Any> {
        encode_json(self.type_url(), self.name(), self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
