//! Snapshot: immutable collection of xDS resources.
//!
//! A snapshot represents a consistent view of all resources for a node
//! at a specific version. Snapshots are:
//!
//! - **Immutable**: Once created, a snapshot cannot be modified
//! - **Versioned**: Each snapshot carries a `{sequence}.0` label
//! - **Type-organized**: Resources are grouped by their type URL
//! - **Checked**: [`Snapshot::consistent`] verifies every cross-collection reference

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use xds_core::{BoxResource, ResourceVersion, TypeUrl, XdsError, XdsResult};

/// Resources for a specific type within a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotResources {
    /// Version string for this resource type.
    version: ResourceVersion,
    /// Resources keyed by name.
    resources: BTreeMap<String, BoxResource>,
    /// Names that were added more than once; only the last one is kept.
    duplicates: BTreeSet<String>,
}

impl SnapshotResources {
    /// Create a new empty resource collection.
    pub fn new(version: impl Into<ResourceVersion>) -> Self {
        Self {
            version: version.into(),
            resources: BTreeMap::new(),
            duplicates: BTreeSet::new(),
        }
    }

    /// Names that were supplied more than once when the collection was built.
    pub fn duplicate_names(&self) -> impl Iterator<Item = &String> {
        self.duplicates.iter()
    }

    /// Get the version for this resource type.
    #[inline]
    pub fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Get the number of resources.
    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if there are no resources.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Get a resource by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&BoxResource> {
        self.resources.get(name)
    }

    /// Check whether a resource with this name exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Iterate over all resources in name order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BoxResource)> {
        self.resources.iter()
    }

    /// Get all resource names in order.
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.resources.keys()
    }

    /// Get all resources as a vec.
    pub fn to_vec(&self) -> Vec<BoxResource> {
        self.resources.values().cloned().collect()
    }
}

/// An immutable snapshot of xDS resources for a node.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Global version for this snapshot.
    version: ResourceVersion,
    /// Resources grouped by type URL.
    resources: BTreeMap<TypeUrl, SnapshotResources>,
    /// Creation timestamp.
    created_at: Instant,
}

impl Snapshot {
    /// Create a new snapshot builder.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Get the global version of this snapshot.
    #[inline]
    pub fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Get the global version as a [`ResourceVersion`].
    #[inline]
    pub fn resource_version(&self) -> &ResourceVersion {
        &self.version
    }

    /// Get the creation timestamp.
    #[inline]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Get resources for a specific type.
    #[inline]
    pub fn get_resources(&self, type_url: &str) -> Option<&SnapshotResources> {
        self.resources.get(type_url)
    }

    /// Get the version for a specific resource type.
    #[inline]
    pub fn get_version(&self, type_url: &str) -> Option<&str> {
        self.resources.get(type_url).map(SnapshotResources::version)
    }

    /// Check if this snapshot contains a specific resource type.
    #[inline]
    pub fn contains_type(&self, type_url: &str) -> bool {
        self.resources.contains_key(type_url)
    }

    /// Get all type URLs present in this snapshot.
    pub fn type_urls(&self) -> impl Iterator<Item = &TypeUrl> {
        self.resources.keys()
    }

    /// Get the total number of resources across all types.
    pub fn total_resources(&self) -> usize {
        self.resources.values().map(SnapshotResources::len).sum()
    }

    /// Check if this snapshot is empty (no resources).
    pub fn is_empty(&self) -> bool {
        self.resources.values().all(SnapshotResources::is_empty)
    }

    /// Verify that every cross-collection reference resolves.
    ///
    /// Checks, in one pass over all resources:
    ///
    /// - every name a resource references exists in the targeted collection
    ///   (route → cluster, listener → route, cluster → endpoints)
    /// - every endpoint collection is claimed by exactly one cluster
    ///
    /// - no collection was built from two resources sharing a name
    ///
    /// All failures are collected into a single
    /// [`XdsError::InconsistentSnapshot`] so the log shows the full picture.
    pub fn consistent(&self) -> XdsResult<()> {
        let mut problems = Vec::new();
        let mut endpoint_claims: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for (type_url, collection) in &self.resources {
            for name in collection.duplicate_names() {
                problems.push(format!(
                    "{} {name:?} is defined more than once",
                    type_url.short_name()
                ));
            }
            for (name, resource) in collection.iter() {
                for reference in resource.references() {
                    let resolved = self
                        .get_resources(reference.type_url)
                        .is_some_and(|target| target.contains(&reference.name));
                    if !resolved {
                        problems.push(format!(
                            "{} {name:?} references missing {reference}",
                            type_url.short_name()
                        ));
                    }
                }
            }
        }

        if let Some(clusters) = self.get_resources(TypeUrl::CLUSTER) {
            for (cluster, resource) in clusters.iter() {
                for reference in resource.references() {
                    if reference.type_url != TypeUrl::ENDPOINT {
                        continue;
                    }
                    if let Some((name, _)) = self
                        .get_resources(TypeUrl::ENDPOINT)
                        .and_then(|endpoints| endpoints.resources.get_key_value(&reference.name))
                    {
                        endpoint_claims.entry(name.as_str()).or_default().insert(cluster.as_str());
                    }
                }
            }
        }

        if let Some(endpoints) = self.get_resources(TypeUrl::ENDPOINT) {
            for name in endpoints.names() {
                match endpoint_claims.get(name.as_str()) {
                    None => problems.push(format!(
                        "ClusterLoadAssignment {name:?} is not referenced by any cluster"
                    )),
                    Some(clusters) if clusters.len() > 1 => problems.push(format!(
                        "ClusterLoadAssignment {name:?} is claimed by {} clusters: {:?}",
                        clusters.len(),
                        clusters
                    )),
                    Some(_) => {}
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(XdsError::InconsistentSnapshot {
                version: self.version.to_string(),
                detail: problems.join("; "),
            })
        }
    }
}

/// Builder for creating snapshots.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    version: ResourceVersion,
    resources: BTreeMap<TypeUrl, SnapshotResources>,
}

impl SnapshotBuilder {
    /// Create a new snapshot builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global version for this snapshot.
    pub fn version(mut self, version: impl Into<ResourceVersion>) -> Self {
        self.version = version.into();
        self
    }

    /// Add resources of a specific type.
    ///
    /// The version for this resource type defaults to the global version.
    pub fn resources(
        mut self,
        type_url: impl Into<TypeUrl>,
        resources: impl IntoIterator<Item = BoxResource>,
    ) -> Self {
        let mut collection = SnapshotResources::new(self.version.clone());
        for resource in resources {
            let name = resource.name().to_string();
            if collection.resources.insert(name.clone(), resource).is_some() {
                collection.duplicates.insert(name);
            }
        }
        self.resources.insert(type_url.into(), collection);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        // Per-type versions follow the final global version even when
        // `version` was set after the resources.
        let resources = self
            .resources
            .into_iter()
            .map(|(type_url, mut collection)| {
                collection.version = self.version.clone();
                (type_url, collection)
            })
            .collect();

        Snapshot {
            version: self.version,
            resources,
            created_at: Instant::now(),
        }
    }
}
