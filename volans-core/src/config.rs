//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, NamespaceKind, Result};

/// What happens to ownership records whose pod the runtime no longer reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipRetention {
    /// Records persist until the process exits
    #[default]
    Keep,
    /// Records not seen by a successful sync are removed
    PruneUnobserved,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// procfs mount point
    pub proc_root: PathBuf,

    /// Namespace kinds to index
    pub namespace_kinds: Vec<NamespaceKind>,

    /// Docker Engine API socket
    pub docker_socket: PathBuf,

    /// Query the container runtime for pod ownership
    pub runtime_enabled: bool,

    /// Bound on one runtime sync, in milliseconds
    pub runtime_timeout_ms: u64,

    /// Bound on one namespace-context section, in milliseconds
    pub netns_timeout_ms: u64,

    /// Display width of process command lines
    pub cmdline_width: usize,

    /// Stale ownership handling
    pub retention: OwnershipRetention,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            namespace_kinds: vec![NamespaceKind::Net],
            docker_socket: PathBuf::from("/var/run/docker.sock"),
            runtime_enabled: true,
            runtime_timeout_ms: 10_000,
            netns_timeout_ms: 5_000,
            cmdline_width: 20,
            retention: OwnershipRetention::Keep,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON configuration file; missing fields take defaults
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or fails validation
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the procfs mount point
    #[must_use]
    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    /// Set the namespace kinds to index
    #[must_use]
    pub fn with_namespace_kinds(mut self, kinds: Vec<NamespaceKind>) -> Self {
        self.namespace_kinds = kinds;
        self
    }

    /// Set the Docker socket path
    #[must_use]
    pub fn with_docker_socket(mut self, socket: impl Into<PathBuf>) -> Self {
        self.docker_socket = socket.into();
        self
    }

    /// Enable or disable runtime correlation
    #[must_use]
    pub fn with_runtime(mut self, enable: bool) -> Self {
        self.runtime_enabled = enable;
        self
    }

    /// Set the command line display width
    #[must_use]
    pub fn with_cmdline_width(mut self, width: usize) -> Self {
        self.cmdline_width = width;
        self
    }

    /// Set the ownership retention policy
    #[must_use]
    pub fn with_retention(mut self, retention: OwnershipRetention) -> Self {
        self.retention = retention;
        self
    }

    /// Set the runtime sync timeout
    #[must_use]
    pub fn with_runtime_timeout(mut self, timeout: Duration) -> Self {
        self.runtime_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the namespace-context timeout
    #[must_use]
    pub fn with_netns_timeout(mut self, timeout: Duration) -> Self {
        self.netns_timeout_ms = duration_ms(timeout);
        self
    }

    /// Runtime sync bound as a `Duration`
    #[must_use]
    pub const fn runtime_timeout(&self) -> Duration {
        Duration::from_millis(self.runtime_timeout_ms)
    }

    /// Namespace-context bound as a `Duration`
    #[must_use]
    pub const fn netns_timeout(&self) -> Duration {
        Duration::from_millis(self.netns_timeout_ms)
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    /// Returns error naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(Error::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.namespace_kinds.is_empty() {
            return invalid("namespace_kinds cannot be empty");
        }
        if self.cmdline_width == 0 {
            return invalid("cmdline_width must be positive");
        }
        if self.netns_timeout_ms == 0 {
            return invalid("netns_timeout_ms must be positive");
        }
        if self.runtime_enabled && self.runtime_timeout_ms == 0 {
            return invalid("runtime_timeout_ms must be positive");
        }
        Ok(())
    }
}

// Saturates instead of wrapping for absurdly long durations
fn duration_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
