//! Node identification for snapshot registration.
//!
//! The serving cache keys snapshots by the node ID a proxy announces
//! (`--node-id`, default `test-id`). [`NodeHash`] turns that ID into a
//! fixed-size FNV-1a key.

use std::fmt;
use std::hash::{Hash, Hasher};

use fnv::FnvHasher;

/// Hash-based node identifier.
///
/// # Example
///
/// ```rust
/// use xds_core::NodeHash;
///
/// let a = NodeHash::from_id("test-id");
/// let b: NodeHash = "test-id".into();
/// assert_eq!(a, b);
/// assert_ne!(a, NodeHash::from_id("other-id"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHash(u64);

impl NodeHash {
    /// Create a node hash from a node ID string.
    #[must_use]
    pub fn from_id(node_id: &str) -> Self {
        let mut hasher = FnvHasher::default();
        node_id.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Get the raw hash value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<&str> for NodeHash {
    fn from(node_id: &str) -> Self {
        Self::from_id(node_id)
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
