//! Provisioning backend contracts.
//!
//! The backend that actually creates, starts and destroys hosts lives
//! outside this crate. The orchestrator only needs to start a node and to
//! obtain a short-lived client for host teardown.

use std::fmt;

use crate::config::{ClusterConfig, StartOptions};
use crate::error::{ClusterError, ClusterResult, HostOp};
use crate::node::Node;

/// Handle to the provisioning backend's host API.
///
/// Acquired fresh for each teardown and dropped afterwards.
pub trait MachineClient {
    /// Tear down the host backing node `name`
    fn delete_host(&self, name: &str) -> ClusterResult<()>;
}

/// Entry point to the provisioning backend
pub trait Provisioner: Send + Sync {
    /// Open a client against the backend.
    ///
    /// Fails with `ProvisioningUnavailable` when the backend cannot be reached.
    fn new_api_client(&self) -> ClusterResult<Box<dyn MachineClient>>;

    /// Provision and bootstrap `node` as a member of `cc`
    fn start_node(&self, cc: &ClusterConfig, node: &Node, opts: &StartOptions) -> ClusterResult<()>;
}

/// Map a backend start failure onto the host-operation error for `node`
pub fn start_failure(node: &str, err: impl fmt::Display) -> ClusterError {
    ClusterError::host(HostOp::Start, node, err)
}

/// Map a backend teardown failure onto the host-operation error for `node`
pub fn delete_failure(node: &str, err: impl fmt::Display) -> ClusterError {
    ClusterError::host(HostOp::Delete, node, err)
}
