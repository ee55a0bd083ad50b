//! Cluster configuration persistence.
//!
//! A [`ConfigStore`] durably keeps one [`ClusterConfig`] per profile name.
//! [`FileSystemStore`] writes `<root>/profiles/<profile>/config.json`;
//! [`InMemoryStore`] keeps everything in a map.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::ClusterConfig;
use crate::error::{ClusterError, ClusterResult};

const PROFILES_DIR: &str = "profiles";
const CONFIG_FILE: &str = "config.json";

/// Durable storage for cluster configurations, keyed by profile name
pub trait ConfigStore: Send + Sync {
    /// Store `cc` under `profile`, replacing any previous record
    fn save(&self, profile: &str, cc: &ClusterConfig) -> ClusterResult<()>;

    /// Load the record stored under `profile`
    fn load(&self, profile: &str) -> ClusterResult<ClusterConfig>;

    /// Check whether a record exists under `profile`
    fn exists(&self, profile: &str) -> bool;

    /// Remove the record stored under `profile`
    fn delete(&self, profile: &str) -> ClusterResult<()>;

    /// Names of all stored profiles, sorted
    fn list(&self) -> ClusterResult<Vec<String>>;
}

/// Profile directory layout on the local filesystem
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Create a store rooted at `root`, creating the profiles directory
    pub fn new<P: AsRef<Path>>(root: P) -> ClusterResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(PROFILES_DIR))?;
        Ok(Self { root })
    }

    /// Directory holding `profile`
    pub fn profile_dir(&self, profile: &str) -> PathBuf {
        self.root.join(PROFILES_DIR).join(profile)
    }

    /// Path of the config file for `profile`
    pub fn config_path(&self, profile: &str) -> PathBuf {
        self.profile_dir(profile).join(CONFIG_FILE)
    }

    fn write_atomic(&self, profile: &str, data: &[u8]) -> std::io::Result<()> {
        let dir = self.profile_dir(profile);
        fs::create_dir_all(&dir)?;

        let tmp_path = dir.join(format!(".{}.{}.tmp", CONFIG_FILE, Uuid::new_v4()));
        let result = (|| {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
            fs::rename(&tmp_path, self.config_path(profile))
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }
}

fn check_profile_name(profile: &str) -> ClusterResult<()> {
    if profile.is_empty() || profile.contains(['/', '\\']) || profile.starts_with('.') {
        return Err(ClusterError::persistence(profile, "invalid profile name"));
    }
    Ok(())
}

impl ConfigStore for FileSystemStore {
    fn save(&self, profile: &str, cc: &ClusterConfig) -> ClusterResult<()> {
        check_profile_name(profile)?;
        let serialized = serde_json::to_vec_pretty(cc)
            .map_err(|e| ClusterError::persistence(profile, e))?;

        self.write_atomic(profile, &serialized)
            .map_err(|e| ClusterError::persistence(profile, e))?;

        debug!("Saved profile {} with {} node(s)", profile, cc.nodes.len());
        Ok(())
    }

    fn load(&self, profile: &str) -> ClusterResult<ClusterConfig> {
        check_profile_name(profile)?;
        let data = match fs::read(self.config_path(profile)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ClusterError::ProfileNotFound(profile.to_string()));
            },
            Err(e) => return Err(ClusterError::persistence(profile, e)),
        };

        serde_json::from_slice(&data).map_err(|e| ClusterError::persistence(profile, e))
    }

    fn exists(&self, profile: &str) -> bool {
        check_profile_name(profile).is_ok() && self.config_path(profile).is_file()
    }

    fn delete(&self, profile: &str) -> ClusterResult<()> {
        check_profile_name(profile)?;
        let dir = self.profile_dir(profile);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| ClusterError::persistence(profile, e))?;
            debug!("Deleted profile {}", profile);
        } else {
            warn!("Attempt to delete non-existent profile {}", profile);
        }
        Ok(())
    }

    fn list(&self) -> ClusterResult<Vec<String>> {
        let dir = self.root.join(PROFILES_DIR);
        let unreadable = |e: std::io::Error| {
            ClusterError::persistence("*", format!("cannot list {}: {}", dir.display(), e))
        };

        let mut profiles = Vec::new();
        for entry in fs::read_dir(&dir).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            if !entry.path().join(CONFIG_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                profiles.push(name.to_string());
            }
        }
        profiles.sort();
        Ok(profiles)
    }
}

/// Map-backed store for tests and embedding
#[derive(Default)]
pub struct InMemoryStore {
    profiles: RwLock<HashMap<String, ClusterConfig>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for InMemoryStore {
    fn save(&self, profile: &str, cc: &ClusterConfig) -> ClusterResult<()> {
        self.profiles.write().insert(profile.to_string(), cc.clone());
        Ok(())
    }

    fn load(&self, profile: &str) -> ClusterResult<ClusterConfig> {
        self.profiles
            .read()
            .get(profile)
            .cloned()
            .ok_or_else(|| ClusterError::ProfileNotFound(profile.to_string()))
    }

    fn exists(&self, profile: &str) -> bool {
        self.profiles.read().contains_key(profile)
    }

    fn delete(&self, profile: &str) -> ClusterResult<()> {
        self.profiles.write().remove(profile);
        Ok(())
    }

    fn list(&self) -> ClusterResult<Vec<String>> {
        let mut profiles: Vec<String> = self.profiles.read().keys().cloned().collect();
        profiles.sort();
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn demo() -> ClusterConfig {
        ClusterConfig::new("demo")
            .driver("docker")
            .with_nodes(vec![Node::new("m01").control_plane(true), Node::new("m02")])
    }

    #[test]
    fn test_file_store_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path()).unwrap();

        store.save("demo", &demo()).unwrap();
        assert!(store.exists("demo"));
        assert!(store.config_path("demo").is_file());

        let loaded = store.load("demo").unwrap();
        assert_eq!(loaded, demo());
    }

    #[test]
    fn test_file_store_overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path()).unwrap();

        store.save("demo", &demo()).unwrap();
        let mut cc = demo();
        cc.nodes.push(Node::new("m03"));
        store.save("demo", &cc).unwrap();

        assert_eq!(store.load("demo").unwrap().nodes.names(), vec!["m01", "m02", "m03"]);
        let entries: Vec<_> = fs::read_dir(store.profile_dir("demo")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_file_store_missing_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path()).unwrap();

        assert!(!store.exists("nope"));
        match store.load("nope") {
            Err(ClusterError::ProfileNotFound(name)) => assert_eq!(name, "nope"),
            other => panic!("Expected ProfileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_file_store_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path()).unwrap();
        fs::create_dir_all(store.profile_dir("demo")).unwrap();
        fs::write(store.config_path("demo"), b"{not json").unwrap();

        match store.load("demo") {
            Err(ClusterError::PersistenceFailure { profile, .. }) => assert_eq!(profile, "demo"),
            other => panic!("Expected PersistenceFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_file_store_rejects_bad_profile_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path()).unwrap();

        assert!(store.save("../escape", &demo()).is_err());
        assert!(store.save("", &demo()).is_err());
        assert!(!store.exists("../escape"));
    }

    #[test]
    fn test_file_store_list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path()).unwrap();

        store.save("beta", &demo()).unwrap();
        store.save("alpha", &demo()).unwrap();
        assert_eq!(store.list().unwrap(), vec!["alpha".to_string(), "beta".to_string()]);

        store.delete("alpha").unwrap();
        assert_eq!(store.list().unwrap(), vec!["beta".to_string()]);

        // deleting twice is not an error
        store.delete("alpha").unwrap();
    }

    #[test]
    fn test_file_store_list_failure_carries_context() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path()).unwrap();
        fs::remove_dir_all(dir.path().join(PROFILES_DIR)).unwrap();

        match store.list() {
            Err(ClusterError::PersistenceFailure { reason, .. }) => {
                assert!(reason.contains(PROFILES_DIR));
            },
            other => panic!("Expected PersistenceFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryStore::new();
        assert!(matches!(store.load("demo"), Err(ClusterError::ProfileNotFound(_))));

        store.save("demo", &demo()).unwrap();
        assert!(store.exists("demo"));
        assert_eq!(store.load("demo").unwrap(), demo());
        assert_eq!(store.list().unwrap(), vec!["demo".to_string()]);

        store.delete("demo").unwrap();
        assert!(!store.exists("demo"));
    }
}
