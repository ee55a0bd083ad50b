//! Cluster node lifecycle
//!
//! This crate manages which nodes belong to a named cluster. It keeps the
//! persisted cluster configuration and the hosts behind the provisioning
//! backend in step across add, delete and lookup, including when one side
//! fails halfway through.

#![deny(rust_2018_idioms, nonstandard_style, future_incompatible)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod machine;
pub mod node;
pub mod persistence;
pub mod registry;

#[doc(hidden)]
pub mod testing;

pub use config::{ClusterConfig, StartOptions};
pub use error::{ClusterError, ClusterResult, ErrorKind, HostOp, LifecycleError, Operation};
pub use lifecycle::{retrieve, DeleteOutcome, HostTeardown, NodeLifecycle};
pub use machine::{MachineClient, Provisioner};
pub use node::{Node, NodeRole};
pub use persistence::{ConfigStore, FileSystemStore, InMemoryStore};
pub use registry::NodeRegistry;

/// Commonly used types
pub mod prelude {
    pub use crate::{
        retrieve, ClusterConfig, ClusterError, ClusterResult, ConfigStore, DeleteOutcome,
        HostTeardown, LifecycleError, MachineClient, Node, NodeLifecycle, Provisioner,
        StartOptions,
    };
}
