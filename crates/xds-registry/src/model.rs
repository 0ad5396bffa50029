//! The service model handed from the poller to the generator.
//!
//! Every type here is built once per poll and replaced wholesale on the next
//! one. Invariants are checked at construction, so a [`ServiceModel`] that
//! exists is always valid input for generation.

use std::collections::BTreeMap;

use xds_core::{XdsError, XdsResult};

/// One backend instance of a service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoint {
    address: String,
    metadata: BTreeMap<String, String>,
}

impl ServiceEndpoint {
    /// Create an endpoint with no metadata.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry (e.g. a routing tag).
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Host the endpoint is reachable at on the service port.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Routing tags of this endpoint.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

/// A named upstream whose endpoints share one port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Service {
    name: String,
    port: u16,
    endpoints: Vec<ServiceEndpoint>,
}

impl Service {
    /// Create a service.
    ///
    /// Fails with [`XdsError::InvalidService`] when the name is empty or the
    /// port is zero. An empty endpoint list is allowed.
    pub fn new(
        name: impl Into<String>,
        port: u16,
        endpoints: impl IntoIterator<Item = ServiceEndpoint>,
    ) -> XdsResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(XdsError::invalid_service(name, "name must not be empty"));
        }
        if port == 0 {
            return Err(XdsError::invalid_service(name, "port must be in 1..=65535"));
        }
        Ok(Self {
            name,
            port,
            endpoints: endpoints.into_iter().collect(),
        })
    }

    /// Service name; also the name of its cluster and endpoint collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port shared by every endpoint.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Endpoints in registry order.
    pub fn endpoints(&self) -> &[ServiceEndpoint] {
        &self.endpoints
    }
}

/// Services keyed by name, iterated in name order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceModel {
    services: BTreeMap<String, Service>,
}

impl ServiceModel {
    /// Build a model, rejecting duplicate service names.
    pub fn new(services: impl IntoIterator<Item = Service>) -> XdsResult<Self> {
        let mut map = BTreeMap::new();
        for service in services {
            if map.contains_key(service.name()) {
                return Err(XdsError::invalid_service(service.name(), "duplicate service name"));
            }
            map.insert(service.name.clone(), service);
        }
        Ok(Self { services: map })
    }

    /// A model holding exactly one service.
    pub fn single(service: Service) -> Self {
        let mut services = BTreeMap::new();
        services.insert(service.name.clone(), service);
        Self { services }
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// Check whether a service exists.
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Iterate over services in name order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Service names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// The service whose name sorts first.
    pub fn first(&self) -> Option<&Service> {
        self.services.values().next()
    }

    /// Number of services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check whether the model holds no services.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
