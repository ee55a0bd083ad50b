//! Node module: one member record of a cluster configuration.

use std::fmt;
use std::net::IpAddr;
use serde::{Serialize, Deserialize};

/// Default API server port for a control-plane node
pub const DEFAULT_API_SERVER_PORT: u16 = 8443;

/// Role a node plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// Runs the control plane
    ControlPlane,

    /// Runs workloads
    Worker,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::ControlPlane => write!(f, "control-plane"),
            NodeRole::Worker => write!(f, "worker"),
        }
    }
}

/// A member of a cluster.
///
/// Apart from `name`, every field is carried through to the provisioning
/// backend untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique name within the owning cluster
    pub name: String,

    /// Address assigned by the provisioning backend, if known
    #[serde(default)]
    pub ip: Option<IpAddr>,

    /// API server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Kubernetes version the node should run
    #[serde(default)]
    pub kubernetes_version: String,

    /// Node runs the control plane
    #[serde(default)]
    pub control_plane: bool,

    /// Node runs workloads
    #[serde(default = "default_worker")]
    pub worker: bool,

    /// Free-form attributes for the provisioning backend
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn default_port() -> u16 {
    DEFAULT_API_SERVER_PORT
}

fn default_worker() -> bool {
    true
}

impl Node {
    /// Create a worker node with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            ip: None,
            port: DEFAULT_API_SERVER_PORT,
            kubernetes_version: String::new(),
            control_plane: false,
            worker: true,
            metadata: serde_json::Map::new(),
        }
    }

    /// Mark the node as a control-plane node
    pub fn control_plane(mut self, control_plane: bool) -> Self {
        self.control_plane = control_plane;
        self
    }

    /// Set whether the node runs workloads
    pub fn worker(mut self, worker: bool) -> Self {
        self.worker = worker;
        self
    }

    /// Set the node address
    pub fn ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Set the API server port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the Kubernetes version
    pub fn kubernetes_version(mut self, version: impl Into<String>) -> Self {
        self.kubernetes_version = version.into();
        self
    }

    /// Add metadata to the node
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get metadata from the node
    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Roles this node carries
    pub fn roles(&self) -> Vec<NodeRole> {
        let mut roles = Vec::with_capacity(2);
        if self.control_plane {
            roles.push(NodeRole::ControlPlane);
        }
        if self.worker {
            roles.push(NodeRole::Worker);
        }
        roles
    }

    /// Check if the node carries `role`
    pub fn has_role(&self, role: NodeRole) -> bool {
        match role {
            NodeRole::ControlPlane => self.control_plane,
            NodeRole::Worker => self.worker,
        }
    }
}
