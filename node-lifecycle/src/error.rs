//! Error types for the node-lifecycle crate.

use std::fmt;
use std::io;
use thiserror::Error;

use crate::config::ClusterConfig;

/// Host-level operation performed through the provisioning backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOp {
    /// Provision and bootstrap a new host
    Start,
    /// Tear down an existing host
    Delete,
}

impl fmt::Display for HostOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostOp::Start => write!(f, "start"),
            HostOp::Delete => write!(f, "delete"),
        }
    }
}

/// Coarse classification of a [`ClusterError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Node name absent from the registry
    NotFound,
    /// Node name already present in the registry
    DuplicateName,
    /// Durable save or load failed
    PersistenceFailure,
    /// No provisioning client handle could be obtained
    ProvisioningUnavailable,
    /// Start or delete of a host failed
    HostOperationFailure,
    /// Invalid configuration value
    Configuration,
}

/// Main error type for node lifecycle operations
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Node not found in the cluster configuration
    #[error("Could not find node {0}")]
    NodeNotFound(String),

    /// Node with the same name already registered
    #[error("Node already exists: {0}")]
    DuplicateName(String),

    /// Saving or loading a cluster configuration failed
    #[error("Failed to persist profile {profile}: {reason}")]
    PersistenceFailure {
        /// Profile key the store was asked to act on
        profile: String,
        /// Underlying failure
        reason: String,
    },

    /// No stored configuration under the given profile
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Could not obtain a handle to the provisioning backend
    #[error("Provisioning backend unavailable: {0}")]
    ProvisioningUnavailable(String),

    /// A host operation reported failure
    #[error("Failed to {op} host {node}: {reason}")]
    HostOperationFailure {
        /// Operation that failed
        op: HostOp,
        /// Node the operation targeted
        node: String,
        /// Underlying failure
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl ClusterError {
    /// Build a persistence failure for `profile`
    pub fn persistence(profile: &str, reason: impl fmt::Display) -> Self {
        ClusterError::PersistenceFailure {
            profile: profile.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build a host operation failure for `node`
    pub fn host(op: HostOp, node: &str, reason: impl fmt::Display) -> Self {
        ClusterError::HostOperationFailure {
            op,
            node: node.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClusterError::NodeNotFound(_) => ErrorKind::NotFound,
            ClusterError::DuplicateName(_) => ErrorKind::DuplicateName,
            ClusterError::PersistenceFailure { .. }
            | ClusterError::ProfileNotFound(_)
            | ClusterError::IoError(_) => ErrorKind::PersistenceFailure,
            ClusterError::ProvisioningUnavailable(_) => ErrorKind::ProvisioningUnavailable,
            ClusterError::HostOperationFailure { .. } => ErrorKind::HostOperationFailure,
            ClusterError::ConfigurationError(_) => ErrorKind::Configuration,
        }
    }
}

/// Type alias for Result with ClusterError
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Orchestrator operation an error was raised from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Adding a node
    Add,
    /// Deleting a node
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => write!(f, "add"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Failure of a mutating orchestrator call.
///
/// The configuration value handed to the call comes back in `config` in
/// whatever state the call left it. Whether that state was persisted depends
/// on which stage failed; see [`LifecycleError::persisted`].
#[derive(Error, Debug)]
#[error("{op} node {node} in cluster {}: {source}", .config.name)]
pub struct LifecycleError {
    /// Operation that failed
    pub op: Operation,
    /// Node the operation targeted
    pub node: String,
    /// Configuration as left by the failed call
    pub config: Box<ClusterConfig>,
    /// Underlying error
    #[source]
    pub source: ClusterError,
}

impl LifecycleError {
    pub(crate) fn new(
        op: Operation,
        node: &str,
        config: ClusterConfig,
        source: ClusterError,
    ) -> Self {
        LifecycleError {
            op,
            node: node.to_string(),
            config: Box::new(config),
            source,
        }
    }

    /// Classify the underlying error
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// Whether this call wrote `config` to the store before failing.
    ///
    /// Only a failed host start during add gets past a successful save.
    pub fn persisted(&self) -> bool {
        matches!(
            (self.op, &self.source),
            (Operation::Add, ClusterError::HostOperationFailure { .. })
        )
    }

    /// Take back the configuration value
    pub fn into_config(self) -> ClusterConfig {
        *self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ClusterError::NodeNotFound("m02".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            ClusterError::persistence("demo", "disk full").kind(),
            ErrorKind::PersistenceFailure
        );
        assert_eq!(
            ClusterError::ProfileNotFound("demo".into()).kind(),
            ErrorKind::PersistenceFailure
        );
        assert_eq!(
            ClusterError::host(HostOp::Delete, "m02", "gone").kind(),
            ErrorKind::HostOperationFailure
        );
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = ClusterError::NodeNotFound("m03".into());
        assert_eq!(err.to_string(), "Could not find node m03");

        let err = ClusterError::host(HostOp::Start, "m02", "driver crashed");
        assert_eq!(err.to_string(), "Failed to start host m02: driver crashed");

        let wrapped = LifecycleError::new(
            Operation::Delete,
            "m02",
            ClusterConfig::new("demo"),
            ClusterError::ProvisioningUnavailable("no daemon".into()),
        );
        let msg = wrapped.to_string();
        assert!(msg.contains("delete node m02"));
        assert!(msg.contains("cluster demo"));
        assert!(!wrapped.persisted());
    }
}
