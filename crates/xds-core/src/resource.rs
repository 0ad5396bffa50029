//! Resource trait for generated xDS resources.
//!
//! Every resource stored in a snapshot implements [`Resource`]. Besides
//! identity and encoding, a resource declares the names it points at in
//! other collections via [`Resource::references`]; the snapshot consistency
//! check is driven entirely by those declarations.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::XdsResult;

/// A named reference from one resource to a resource of another type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    /// Type URL of the referenced resource.
    pub type_url: &'static str,
    /// Name of the referenced resource.
    pub name: String,
}

impl ResourceRef {
    /// Create a reference to `name` in the `type_url` collection.
    pub fn new(type_url: &'static str, name: impl Into<String>) -> Self {
        Self {
            type_url,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.type_url.rsplit('.').next().unwrap_or(self.type_url);
        write!(f, "{}/{}", short, self.name)
    }
}

/// Trait for xDS resources.
///
/// # Example
///
/// ```rust
/// use std::any::Any as StdAny;
/// use xds_core::{Resource, ResourceRef, TypeUrl, XdsResult};
///
/// #[derive(Debug)]
/// struct Route {
///     name: String,
///     cluster: String,
/// }
///
/// impl Resource for Route {
///     fn type_url(&self) -> &'static str {
///         TypeUrl::ROUTE
///     }
///
///     fn name(&self) -> &str {
///         &self.name
///     }
///
///     fn references(&self) -> Vec<ResourceRef> {
///         vec![ResourceRef::new(TypeUrl::CLUSTER, self.cluster.clone())]
///     }
///
///     fn encode(&self) -> XdsResult<prost_types::Any> {
///         Ok(prost_types::Any {
///             type_url: self.type_url().to_string(),
///             value: self.name.as_bytes().to_vec(),
///         })
///     }
///
///     fn as_any(&self) -> &dyn StdAny {
///         self
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Get the type URL for this resource.
    fn type_url(&self) -> &'static str;

    /// Get the resource name.
    fn name(&self) -> &str;

    /// Names this resource points at in other collections.
    fn references(&self) -> Vec<ResourceRef> {
        Vec::new()
    }

    /// Encode the resource into an opaque `Any` envelope.
    fn encode(&self) -> XdsResult<prost_types::Any>;

    /// Convert to Any for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl dyn Resource {
    /// Downcast to a concrete resource type.
    pub fn downcast_ref<T: Resource + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Type alias for a shared resource.
/// Uses Arc so snapshots can be cloned without copying resources.
pub type BoxResource = Arc<dyn Resource>;
