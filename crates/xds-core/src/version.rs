//! Snapshot version labels.
//!
//! Every snapshot produced for a node is labelled `"{sequence}.0"`, where
//! `sequence` starts at 0 and grows by exactly one per snapshot.
//! [`ResourceVersion`] wraps the label and can recover the sequence from it.

use std::cmp::Ordering;
use std::fmt;

/// Version label of a snapshot.
///
/// Labels that parse as `{sequence}.0` order by sequence; anything else
/// falls back to string ordering and sorts after every sequenced label.
///
/// # Example
///
/// ```rust
/// use xds_core::ResourceVersion;
///
/// let v9 = ResourceVersion::from_sequence(9);
/// let v10 = ResourceVersion::from_sequence(10);
///
/// assert_eq!(v10.as_str(), "10.0");
/// assert!(v9 < v10); // numeric, not lexicographic
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    /// Create a version from an arbitrary label.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Create the label for a snapshot sequence number.
    #[must_use]
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("{sequence}.0"))
    }

    /// Recover the sequence number, if the label has the `{sequence}.0` form.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        let (major, minor) = self.0.split_once('.')?;
        if minor != "0" {
            return None;
        }
        major.parse().ok()
    }

    /// Check if the version is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Ord for ResourceVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.sequence(), other.sequence()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ResourceVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceVersion {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceVersion {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<ResourceVersion> for String {
    fn from(v: ResourceVersion) -> Self {
        v.0
    }
}

impl AsRef<str> for ResourceVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
