//! Error types for the snapshot pipeline.
//!
//! [`XdsError`] covers every failure the pipeline can hit, from a failed
//! registry lookup to a snapshot rejected by the serving cache. Errors are
//! split into two classes:
//!
//! - **transient**: the current poll tick is skipped and the next one retries
//! - **fatal**: a programming or configuration defect; the supervisor stops
//!   the process

/// Error type for snapshot generation and distribution.
///
/// # Example
///
/// ```rust
/// use xds_core::XdsError;
///
/// fn first_service(names: &[&str]) -> Result<String, XdsError> {
///     names.first().map(|n| n.to_string()).ok_or(XdsError::EmptyModel)
/// }
///
/// let err = first_service(&[]).unwrap_err();
/// assert!(!err.is_transient());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum XdsError {
    /// Name resolution failed or returned no addresses.
    #[error("failed to resolve {target}: {message}")]
    Resolution {
        /// The symbolic name that was looked up.
        target: String,
        /// Description of the failure.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// A service violates the model invariants.
    #[error("invalid service {name:?}: {reason}")]
    InvalidService {
        /// The service name as supplied.
        name: String,
        /// Reason the service was rejected.
        reason: String,
    },

    /// The service model holds no services, so there is no default route target.
    #[error("service model is empty: at least one service is required to generate a snapshot")]
    EmptyModel,

    /// A cross-resource reference does not resolve.
    #[error("snapshot {version} is inconsistent: {detail}")]
    InconsistentSnapshot {
        /// Version label of the offending snapshot.
        version: String,
        /// Which references failed to resolve.
        detail: String,
    },

    /// The serving cache refused the snapshot.
    #[error("snapshot {version} rejected for node {node}: {reason}")]
    SnapshotRejected {
        /// Node the snapshot was registered for.
        node: String,
        /// Version label of the rejected snapshot.
        version: String,
        /// Reason for the rejection.
        reason: String,
    },

    /// Encoding a resource into its opaque envelope failed.
    #[error("encoding error for {type_url}/{name}: {message}")]
    EncodingError {
        /// The type URL being encoded.
        type_url: String,
        /// The resource name.
        name: String,
        /// Error message.
        message: String,
    },

    /// The snapshot channel has no receiver left.
    #[error("snapshot channel closed")]
    ChannelClosed,

    /// The snapshot channel already holds an unconsumed snapshot.
    #[error("snapshot channel full: version {pending} could not be published")]
    ChannelFull {
        /// Version of the snapshot that could not be published.
        pending: String,
    },

    /// A background task stopped unexpectedly.
    #[error("task {task} failed: {message}")]
    TaskFailed {
        /// Name of the task.
        task: String,
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl XdsError {
    /// Create a resolution error from any error type.
    pub fn resolution<E>(target: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Resolution {
            target: target.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a resolution error reporting that a name has no addresses.
    pub fn no_addresses(target: impl Into<String>) -> Self {
        Self::Resolution {
            target: target.into(),
            message: "no addresses found".to_string(),
            source: None,
        }
    }

    /// Create an invalid-service error.
    pub fn invalid_service(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidService {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure is environmental and may clear on the next poll.
    ///
    /// Everything that is not transient indicates a defect and is fatal.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Resolution { .. } | Self::Timeout { .. })
    }
}
