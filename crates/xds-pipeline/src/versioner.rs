//! Version labels and the pre-publication consistency gate.

use tracing::{debug, error};
use xds_cache::Snapshot;
use xds_core::{ResourceVersion, XdsResult};

use crate::generator::GeneratedResourceSet;

/// Tag `set` with the label for `sequence` and check it.
///
/// The label is `"{sequence}.0"`. Fails with
/// [`XdsError::InconsistentSnapshot`](xds_core::XdsError::InconsistentSnapshot)
/// when a reference between collections does not resolve.
pub fn version(set: &GeneratedResourceSet, sequence: u64) -> XdsResult<Snapshot> {
    let snapshot = set
        .to_resources()
        .into_iter()
        .fold(
            Snapshot::builder().version(ResourceVersion::from_sequence(sequence)),
            |builder, (type_url, resources)| builder.resources(type_url, resources),
        )
        .build();

    snapshot.consistent()?;
    Ok(snapshot)
}

/// Hands out gap-free, strictly increasing version labels.
#[derive(Debug, Default)]
pub struct SnapshotVersioner {
    next: u64,
}

impl SnapshotVersioner {
    /// Start at sequence 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at an arbitrary sequence.
    pub fn starting_at(sequence: u64) -> Self {
        Self { next: sequence }
    }

    /// Sequence the next successful snapshot will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next
    }

    /// Version `set` with the next sequence.
    ///
    /// The sequence only advances when the snapshot is consistent.
    pub fn next_snapshot(&mut self, set: &GeneratedResourceSet) -> XdsResult<Snapshot> {
        match version(set, self.next) {
            Ok(snapshot) => {
                self.next += 1;
                debug!(
                    version = %snapshot.version(),
                    resources = snapshot.total_resources(),
                    "versioned snapshot"
                );
                Ok(snapshot)
            }
            Err(e) => {
                error!(
                    sequence = self.next,
                    error = %e,
                    resources = ?set,
                    "snapshot inconsistency"
                );
                Err(e)
            }
        }
    }
}
