//! Node lifecycle orchestration.
//!
//! [`NodeLifecycle`] composes a [`ConfigStore`] and a [`Provisioner`] into
//! the add / delete / retrieve operations on a cluster's node roster. Every
//! mutating call takes the [`ClusterConfig`] by value and hands it back,
//! inside the outcome on success and inside [`LifecycleError`] on failure.
//!
//! Calls are synchronous and take no locks. Callers serialize concurrent
//! add/delete against the same profile themselves; two interleaved
//! load-modify-save sequences will overwrite each other.

use log::{debug, error, info, warn};

use crate::config::{ClusterConfig, StartOptions};
use crate::error::{ClusterError, ClusterResult, LifecycleError, Operation};
use crate::machine::Provisioner;
use crate::node::Node;
use crate::persistence::ConfigStore;

/// Find node `name` in `cc`, returning it with its zero-based position
pub fn retrieve<'a>(cc: &'a ClusterConfig, name: &str) -> ClusterResult<(&'a Node, usize)> {
    cc.nodes.find(name)
}

/// Result of the best-effort host teardown during delete
#[derive(Debug)]
pub enum HostTeardown {
    /// The backend deleted the host
    Deleted,
    /// The backend failed; the node was removed from the roster anyway
    Failed(ClusterError),
}

impl HostTeardown {
    /// Whether the host was deleted
    pub fn is_deleted(&self) -> bool {
        matches!(self, HostTeardown::Deleted)
    }
}

/// Successful delete: the roster without the node, persisted
#[derive(Debug)]
pub struct DeleteOutcome {
    /// Updated and persisted configuration
    pub config: ClusterConfig,
    /// The node that was removed
    pub removed: Node,
    /// Position the node held
    pub index: usize,
    /// What happened to the backing host
    pub host_teardown: HostTeardown,
}

/// Orchestrates node membership for clusters
pub struct NodeLifecycle<S, P> {
    store: S,
    provisioner: P,
    start_options: StartOptions,
}

impl<S: ConfigStore, P: Provisioner> NodeLifecycle<S, P> {
    /// Create an orchestrator with default start options
    pub fn new(store: S, provisioner: P) -> Self {
        Self {
            store,
            provisioner,
            start_options: StartOptions::default(),
        }
    }

    /// Use `opts` when starting new nodes
    pub fn with_start_options(mut self, opts: StartOptions) -> Self {
        self.start_options = opts;
        self
    }

    /// Options handed to the provisioner on start
    pub fn start_options(&self) -> &StartOptions {
        &self.start_options
    }

    /// Underlying configuration store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Underlying provisioner
    pub fn provisioner(&self) -> &P {
        &self.provisioner
    }

    /// Load the configuration stored under `profile`
    pub fn load(&self, profile: &str) -> ClusterResult<ClusterConfig> {
        let cc = self.store.load(profile)?;
        cc.validate()?;
        Ok(cc)
    }

    /// Find node `name` in `cc`
    pub fn retrieve<'a>(
        &self,
        cc: &'a ClusterConfig,
        name: &str,
    ) -> ClusterResult<(&'a Node, usize)> {
        retrieve(cc, name)
    }

    /// Add `node` to `cc`, persist under `cc.name`, then start it.
    ///
    /// A save failure returns the config with the node appended but not
    /// persisted, and nothing is started. A start failure returns the
    /// persisted config: the node stays registered without a host.
    pub fn add(&self, mut cc: ClusterConfig, node: Node) -> Result<ClusterConfig, LifecycleError> {
        let name = node.name.clone();
        if cc.nodes.contains(&name) {
            return Err(LifecycleError::new(
                Operation::Add,
                &name,
                cc,
                ClusterError::DuplicateName(name.clone()),
            ));
        }

        let pending = node.clone();
        cc.nodes.push(node);
        if let Err(e) = self.store.save(&cc.name, &cc) {
            return Err(LifecycleError::new(Operation::Add, &name, cc, e));
        }
        info!("Registered node {} in cluster {}", name, cc.name);

        if let Err(e) = self.provisioner.start_node(&cc, &pending, &self.start_options) {
            error!("Node {} is registered in cluster {} but failed to start: {}", name, cc.name, e);
            return Err(LifecycleError::new(Operation::Add, &name, cc, e));
        }

        debug!("Started node {}", name);
        Ok(cc)
    }

    /// Tear down node `name`'s host and remove it from `cc`, persisting
    /// the result under `profile`.
    ///
    /// Host teardown is best effort: its failure is reported in the
    /// outcome and does not stop the roster update.
    pub fn delete(
        &self,
        profile: &str,
        mut cc: ClusterConfig,
        name: &str,
    ) -> Result<DeleteOutcome, LifecycleError> {
        let index = match retrieve(&cc, name) {
            Ok((_, index)) => index,
            Err(e) => return Err(LifecycleError::new(Operation::Delete, name, cc, e)),
        };

        let client = match self.provisioner.new_api_client() {
            Ok(client) => client,
            Err(e) => return Err(LifecycleError::new(Operation::Delete, name, cc, e)),
        };

        let host_teardown = match client.delete_host(name) {
            Ok(()) => HostTeardown::Deleted,
            Err(e) => {
                warn!(
                    "Failed to delete host {}, removing it from cluster {} anyway: {}",
                    name, cc.name, e
                );
                HostTeardown::Failed(e)
            }
        };
        drop(client);

        let removed = match cc.nodes.remove(index) {
            Ok(node) => node,
            Err(e) => return Err(LifecycleError::new(Operation::Delete, name, cc, e)),
        };

        if let Err(e) = self.store.save(profile, &cc) {
            return Err(LifecycleError::new(Operation::Delete, name, cc, e));
        }
        info!("Removed node {} from cluster {}", name, cc.name);

        Ok(DeleteOutcome {
            config: cc,
            removed,
            index,
            host_teardown,
        })
    }
}

#[cfg(test)]
use mockall::mock;

#[cfg(test)]
mock! {
    pub Store {}

    impl ConfigStore for Store {
        fn save(&self, profile: &str, cc: &ClusterConfig) -> ClusterResult<()>;
        fn load(&self, profile: &str) -> ClusterResult<ClusterConfig>;
        fn exists(&self, profile: &str) -> bool;
        fn delete(&self, profile: &str) -> ClusterResult<()>;
        fn list(&self) -> ClusterResult<Vec<String>>;
    }
}

#[cfg(test)]
mock! {
    pub Client {}

    impl crate::machine::MachineClient for Client {
        fn delete_host(&self, name: &str) -> ClusterResult<()>;
    }
}

#[cfg(test)]
mock! {
    pub Backend {}

    impl Provisioner for Backend {
        fn new_api_client(&self) -> ClusterResult<Box<dyn crate::machine::MachineClient>>;
        fn start_node(
            &self,
            cc: &ClusterConfig,
            node: &Node,
            opts: &StartOptions,
        ) -> ClusterResult<()>;
    }
}
