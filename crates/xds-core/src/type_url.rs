//! Type URLs of the resource kinds a snapshot carries.

use std::borrow::Borrow;
use std::fmt;

/// Type URL wrapper for xDS resource types.
///
/// # Example
///
/// ```rust
/// use xds_core::TypeUrl;
///
/// let endpoints = TypeUrl::new(TypeUrl::ENDPOINT);
/// assert_eq!(endpoints.short_name(), "ClusterLoadAssignment");
/// assert!(TypeUrl::CORE.contains(&TypeUrl::LISTENER));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeUrl(String);

impl TypeUrl {
    /// Type URL for Cluster (CDS).
    pub const CLUSTER: &'static str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";

    /// Type URL for ClusterLoadAssignment (EDS).
    pub const ENDPOINT: &'static str =
        "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";

    /// Type URL for Listener (LDS).
    pub const LISTENER: &'static str = "type.googleapis.com/envoy.config.listener.v3.Listener";

    /// Type URL for RouteConfiguration (RDS).
    pub const ROUTE: &'static str =
        "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";

    /// The four collections every generated snapshot holds, in dependency
    /// order (a collection only references collections listed before it).
    pub const CORE: [&'static str; 4] =
        [Self::ENDPOINT, Self::CLUSTER, Self::ROUTE, Self::LISTENER];

    /// Create a new type URL from a string.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Get the type URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the message name, e.g. `Cluster` for the CDS type URL.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.rsplit('/').next().and_then(|s| s.rsplit('.').next()).unwrap_or(&self.0)
    }
}

impl fmt::Display for TypeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeUrl {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TypeUrl {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TypeUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TypeUrl {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for TypeUrl {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
