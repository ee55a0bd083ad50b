//! Configuration module: the durable cluster record and the options the
//! start path consumes.

use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::error::{ClusterError, ClusterResult};
use crate::node::Node;
use crate::registry::NodeRegistry;

/// Cache images for the new node
pub const CACHE_IMAGES: &str = "cache-images";

/// Wait for the node to become healthy after start
pub const WAIT_UNTIL_HEALTHY: &str = "wait";

/// Images to preload into the node's cache
pub const CACHE_IMAGE_CONFIG_KEY: &str = "cache";

/// Container runtime to install on the node
pub const CONTAINER_RUNTIME: &str = "container-runtime";

/// Embed certificates in the kubeconfig instead of referencing files
pub const EMBED_CERTS: &str = "embed-certs";

/// Leave the current kubeconfig context untouched
pub const KEEP_CONTEXT: &str = "keep-context";

/// Host and guest paths for the mount, `host:guest`
pub const MOUNT_STRING: &str = "mount-string";

/// Mount a host directory into the node
pub const CREATE_MOUNT: &str = "mount";

/// How long to wait for the node to become healthy
pub const WAIT_TIMEOUT: &str = "wait-timeout";

/// Default wait timeout in seconds
pub const DEFAULT_WAIT_TIMEOUT: u64 = 360;

/// Container runtimes the start path knows how to install
pub const SUPPORTED_RUNTIMES: &[&str] = &["docker", "containerd", "cri-o"];

/// Durable state of one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster name, also the persistence key
    pub name: String,

    /// Provisioning driver the cluster was created with
    #[serde(default)]
    pub driver: String,

    /// Kubernetes version new nodes default to
    #[serde(default)]
    pub kubernetes_version: String,

    /// Member nodes, in insertion order
    #[serde(default)]
    pub nodes: NodeRegistry,
}

impl ClusterConfig {
    /// Create an empty cluster configuration
    pub fn new(name: impl Into<String>) -> Self {
        ClusterConfig {
            name: name.into(),
            driver: String::new(),
            kubernetes_version: String::new(),
            nodes: NodeRegistry::new(),
        }
    }

    /// Set the provisioning driver
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    /// Set the default Kubernetes version
    pub fn kubernetes_version(mut self, version: impl Into<String>) -> Self {
        self.kubernetes_version = version.into();
        self
    }

    /// Set the member nodes
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes = nodes.into_iter().collect();
        self
    }

    /// The first control-plane node, if any
    pub fn primary_control_plane(&self) -> Option<&Node> {
        self.nodes.iter().find(|node| node.control_plane)
    }

    /// Check the record is well formed
    pub fn validate(&self) -> ClusterResult<()> {
        if self.name.is_empty() {
            return Err(ClusterError::ConfigurationError(
                "Cluster name must not be empty".to_string(),
            ));
        }
        self.nodes.check_unique()
    }
}

/// Options passed to the provisioning backend when starting a node
#[derive(Debug, Clone, PartialEq)]
pub struct StartOptions {
    /// Cache images for the node
    pub cache_images: bool,

    /// Images to preload
    pub cached_images: Vec<String>,

    /// Wait for the node to report healthy
    pub wait_until_healthy: bool,

    /// Upper bound on the health wait
    pub wait_timeout: Duration,

    /// Container runtime to install
    pub container_runtime: String,

    /// Embed certificates in kubeconfig
    pub embed_certs: bool,

    /// Keep the current kubeconfig context
    pub keep_context: bool,

    /// Mount a host directory
    pub create_mount: bool,

    /// `host:guest` mount specification
    pub mount_string: Option<String>,
}

impl Default for StartOptions {
    fn default() -> Self {
        StartOptions {
            cache_images: true,
            cached_images: Vec::new(),
            wait_until_healthy: true,
            wait_timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT),
            container_runtime: "docker".to_string(),
            embed_certs: false,
            keep_context: false,
            create_mount: false,
            mount_string: None,
        }
    }
}

impl StartOptions {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether images are cached
    pub fn cache_images(mut self, enabled: bool) -> Self {
        self.cache_images = enabled;
        self
    }

    /// Set the images to preload
    pub fn cached_images(mut self, images: Vec<String>) -> Self {
        self.cached_images = images;
        self
    }

    /// Set whether start waits for the node to be healthy
    pub fn wait_until_healthy(mut self, wait: bool) -> Self {
        self.wait_until_healthy = wait;
        self
    }

    /// Set the health wait timeout
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Set the container runtime
    pub fn container_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.container_runtime = runtime.into();
        self
    }

    /// Set whether certificates are embedded
    pub fn embed_certs(mut self, embed: bool) -> Self {
        self.embed_certs = embed;
        self
    }

    /// Set whether the kubeconfig context is kept
    pub fn keep_context(mut self, keep: bool) -> Self {
        self.keep_context = keep;
        self
    }

    /// Mount `spec` (`host:guest`) into the node
    pub fn with_mount(mut self, spec: impl Into<String>) -> Self {
        self.create_mount = true;
        self.mount_string = Some(spec.into());
        self
    }

    /// Build options from string settings keyed by the constants in this module
    pub fn from_pairs<'a, I>(pairs: I) -> ClusterResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut opts = StartOptions::default();
        for (key, value) in pairs {
            match key {
                CACHE_IMAGES => opts.cache_images = parse_bool(key, value)?,
                WAIT_UNTIL_HEALTHY => opts.wait_until_healthy = parse_bool(key, value)?,
                CACHE_IMAGE_CONFIG_KEY => {
                    opts.cached_images = value
                        .split(',')
                        .map(str::trim)
                        .filter(|image| !image.is_empty())
                        .map(str::to_string)
                        .collect();
                },
                CONTAINER_RUNTIME => opts.container_runtime = value.to_string(),
                EMBED_CERTS => opts.embed_certs = parse_bool(key, value)?,
                KEEP_CONTEXT => opts.keep_context = parse_bool(key, value)?,
                MOUNT_STRING => opts.mount_string = Some(value.to_string()),
                CREATE_MOUNT => opts.create_mount = parse_bool(key, value)?,
                WAIT_TIMEOUT => opts.wait_timeout = parse_duration(key, value)?,
                other => {
                    return Err(ClusterError::ConfigurationError(
                        format!("Unknown start option: {}", other),
                    ));
                }
            }
        }
        opts.build()
    }

    /// Validate and build the options
    pub fn build(self) -> ClusterResult<Self> {
        if !SUPPORTED_RUNTIMES.contains(&self.container_runtime.as_str()) {
            return Err(ClusterError::ConfigurationError(
                format!("Unsupported container runtime: {}", self.container_runtime),
            ));
        }

        if self.wait_until_healthy && self.wait_timeout.is_zero() {
            return Err(ClusterError::ConfigurationError(
                "Wait timeout must be non-zero when waiting for health".to_string(),
            ));
        }

        if self.create_mount {
            match self.mount_string.as_deref() {
                Some(spec) if spec.contains(':') => {},
                Some(spec) => {
                    return Err(ClusterError::ConfigurationError(
                        format!("Mount string must be host:guest, got {}", spec),
                    ));
                },
                None => {
                    return Err(ClusterError::ConfigurationError(
                        "Mount is enabled but mount string is missing".to_string(),
                    ));
                }
            }
        }

        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> ClusterResult<bool> {
    match value.trim() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ClusterError::ConfigurationError(
            format!("Invalid boolean for {}: {}", key, other),
        )),
    }
}

/// Parses `90`, `90s`, `6m` or `1h`; bare numbers are seconds.
fn parse_duration(key: &str, value: &str) -> ClusterResult<Duration> {
    let value = value.trim();
    let (digits, scale) = match value.char_indices().last() {
        Some((i, 's')) => (&value[..i], 1),
        Some((i, 'm')) => (&value[..i], 60),
        Some((i, 'h')) => (&value[..i], 3600),
        _ => (value, 1),
    };
    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(scale))
        .map(Duration::from_secs)
        .ok_or_else(|| ClusterError::ConfigurationError(
            format!("Invalid duration for {}: {}", key, value),
        ))
}
