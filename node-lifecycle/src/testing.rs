//! Test doubles for the provisioning backend and the config store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{ClusterConfig, StartOptions};
use crate::error::{ClusterError, ClusterResult};
use crate::machine::{delete_failure, start_failure, MachineClient, Provisioner};
use crate::node::Node;
use crate::persistence::ConfigStore;

/// Calls seen by a [`RecordingProvisioner`]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProvisionerLog {
    /// Nodes passed to `start_node`, in call order
    pub started: Vec<String>,
    /// Hosts passed to `delete_host`, in call order
    pub deleted: Vec<String>,
    /// Number of clients handed out
    pub clients: usize,
}

#[derive(Default)]
struct Faults {
    unavailable: bool,
    failing_starts: HashSet<String>,
    failing_deletes: HashSet<String>,
}

/// Provisioner that records calls and fails on demand
#[derive(Clone, Default)]
pub struct RecordingProvisioner {
    log: Arc<Mutex<ProvisionerLog>>,
    faults: Arc<Mutex<Faults>>,
}

impl RecordingProvisioner {
    /// Create a provisioner where every call succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `new_api_client` fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.lock().unavailable = unavailable;
    }

    /// Make `start_node` fail for `name`
    pub fn fail_start(&self, name: &str) {
        self.faults.lock().failing_starts.insert(name.to_string());
    }

    /// Make `delete_host` fail for `name`
    pub fn fail_delete(&self, name: &str) {
        self.faults.lock().failing_deletes.insert(name.to_string());
    }

    /// Snapshot of the calls seen so far
    pub fn log(&self) -> ProvisionerLog {
        self.log.lock().clone()
    }
}

struct RecordingClient {
    log: Arc<Mutex<ProvisionerLog>>,
    faults: Arc<Mutex<Faults>>,
}

impl MachineClient for RecordingClient {
    fn delete_host(&self, name: &str) -> ClusterResult<()> {
        self.log.lock().deleted.push(name.to_string());
        if self.faults.lock().failing_deletes.contains(name) {
            return Err(delete_failure(name, "machine does not exist"));
        }
        Ok(())
    }
}

impl Provisioner for RecordingProvisioner {
    fn new_api_client(&self) -> ClusterResult<Box<dyn MachineClient>> {
        if self.faults.lock().unavailable {
            return Err(ClusterError::ProvisioningUnavailable(
                "backend is not running".to_string(),
            ));
        }
        self.log.lock().clients += 1;
        Ok(Box::new(RecordingClient {
            log: self.log.clone(),
            faults: self.faults.clone(),
        }))
    }

    fn start_node(
        &self,
        _cc: &ClusterConfig,
        node: &Node,
        _opts: &StartOptions,
    ) -> ClusterResult<()> {
        self.log.lock().started.push(node.name.clone());
        if self.faults.lock().failing_starts.contains(&node.name) {
            return Err(start_failure(&node.name, "bootstrap failed"));
        }
        Ok(())
    }
}

/// Store wrapper whose `save` can be made to fail
pub struct FlakyStore<S> {
    inner: S,
    fail_saves: AtomicBool,
}

impl<S: ConfigStore> FlakyStore<S> {
    /// Wrap `inner`; saves pass through until [`FlakyStore::fail_saves`]
    pub fn new(inner: S) -> Self {
        FlakyStore {
            inner,
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Toggle save failures
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ConfigStore> ConfigStore for FlakyStore<S> {
    fn save(&self, profile: &str, cc: &ClusterConfig) -> ClusterResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ClusterError::persistence(profile, "injected save failure"));
        }
        self.inner.save(profile, cc)
    }

    fn load(&self, profile: &str) -> ClusterResult<ClusterConfig> {
        self.inner.load(profile)
    }

    fn exists(&self, profile: &str) -> bool {
        self.inner.exists(profile)
    }

    fn delete(&self, profile: &str) -> ClusterResult<()> {
        self.inner.delete(profile)
    }

    fn list(&self) -> ClusterResult<Vec<String>> {
        self.inner.list()
    }
}
