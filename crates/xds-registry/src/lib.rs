//! # xds-registry
//!
//! Where the pipeline's input comes from.
//!
//! - [`ServiceModel`] - Validated services keyed by name
//! - [`Resolver`] - Pluggable target lookup, with [`DnsResolver`] and [`StaticResolver`]
//! - [`RegistryPoller`] - Rebuilds the model from the resolver on a fixed cadence
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xds_registry::{DnsResolver, PollerConfig, RegistryPoller};
//!
//! let resolver = Arc::new(DnsResolver::from_env()?);
//! let poller = RegistryPoller::new(resolver, PollerConfig::default())?;
//! let model = poller.poll_once().await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod model;
mod poller;
mod resolver;

pub use model::{Service, ServiceEndpoint, ServiceModel};
pub use poller::{ModelHandler, PollerConfig, RegistryPoller, GROUP_KEY, HOST_KEY};
pub use resolver::{parse_server, DnsConfig, DnsResolver, Resolver, StaticResolver, DNS_ENV};
