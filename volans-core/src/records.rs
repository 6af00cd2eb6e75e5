//! Records produced and stored by the engine
//!
//! `NamespaceMembership` and `ContainerOwnership` live in the index and
//! correlator tables. The rest are derived per query and never cached.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CpuAffinity, NamespaceId, NamespaceKind, ProcessId};

/// A process currently belongs to a namespace instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceMembership {
    /// Member process
    pub pid: ProcessId,
    /// Namespace instance
    pub namespace_id: NamespaceId,
    /// Namespace kind
    pub kind: NamespaceKind,
}

/// Role of a container inside its pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// The pause container holding the pod's namespaces
    Sandbox,
    /// A workload container joined to the sandbox
    Container,
}

impl ContainerKind {
    /// Value of the `io.kubernetes.docker.type` label
    #[must_use]
    pub const fn label_value(self) -> &'static str {
        match self {
            Self::Sandbox => "podsandbox",
            Self::Container => "container",
        }
    }

    /// Parse the `io.kubernetes.docker.type` label value
    #[must_use]
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "podsandbox" => Some(Self::Sandbox),
            "container" => Some(Self::Container),
            _ => None,
        }
    }
}

/// Pod identity owning a process, unique by (pod namespace, pod name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOwnership {
    /// Current owning process, overwritten on restart
    pub pid: ProcessId,
    /// Kubernetes namespace of the pod
    pub pod_namespace: String,
    /// Pod name
    pub pod_name: String,
    /// Container role
    pub kind: ContainerKind,
}

impl ContainerOwnership {
    /// `namespace/name` label used in summaries
    #[must_use]
    pub fn pod_label(&self) -> String {
        format!("{}/{}", self.pod_namespace, self.pod_name)
    }
}

/// One row of the namespace list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSummary {
    /// Namespace instance
    pub namespace_id: NamespaceId,
    /// Namespace kind
    pub kind: NamespaceKind,
    /// Number of indexed member processes
    pub member_count: usize,
    /// Owning pod as `namespace/name`, when one is known
    pub owner_pod: Option<String>,
}

/// Channel configuration reported by the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Combined channels in use
    pub combined: u32,
    /// Maximum combined channels supported
    pub max_combined: u32,
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.combined, self.max_combined)
    }
}

/// Driver offload switches, all off when the driver cannot be queried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct OffloadFeatures {
    /// TCP segmentation offload
    pub tso: bool,
    /// Generic segmentation offload
    pub gso: bool,
    /// Large receive offload
    pub lro: bool,
    /// Generic receive offload
    pub gro: bool,
    /// Scatter-gather
    pub scatter_gather: bool,
    /// Receive checksumming
    pub rx_checksum: bool,
    /// Transmit checksumming
    pub tx_checksum: bool,
}

/// Interface flag bits and their display names
const LINK_FLAG_NAMES: [(u32, &str); 6] = [
    (libc::IFF_UP as u32, "up"),
    (libc::IFF_BROADCAST as u32, "broadcast"),
    (libc::IFF_LOOPBACK as u32, "loopback"),
    (libc::IFF_POINTOPOINT as u32, "pointtopoint"),
    (libc::IFF_MULTICAST as u32, "multicast"),
    (libc::IFF_RUNNING as u32, "running"),
];

/// `IFF_*` interface flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkFlags(u32);

impl LinkFlags {
    /// Wrap raw `IFF_*` bits
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if the interface is administratively up
    #[must_use]
    pub const fn is_up(self) -> bool {
        self.0 & libc::IFF_UP as u32 != 0
    }

    /// Names of the known flags that are set
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        LINK_FLAG_NAMES
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Display for LinkFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            f.write_str("0")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Merged counters and link state for one interface
///
/// Link-derived fields stay empty when the counters row had no matching link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceStat {
    /// Interface name
    pub name: String,
    /// Driver name or hardware type
    pub link_type: Option<String>,
    /// MAC address, `aa:bb:cc:dd:ee:ff`
    pub hardware_address: Option<String>,
    /// Non link-local addresses
    pub addresses: Vec<String>,
    /// Receive errors
    pub rx_errors: u64,
    /// Receive drops
    pub rx_dropped: u64,
    /// Transmit errors
    pub tx_errors: u64,
    /// Transmit drops
    pub tx_dropped: u64,
    /// MTU, zero when unknown
    pub mtu: u32,
    /// Interface flags
    pub flags: LinkFlags,
    /// Channel configuration
    pub channels: Option<ChannelConfig>,
    /// Offload switches
    pub offload: OffloadFeatures,
}

/// Attributes of one process sharing a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessAttributes {
    /// Process id
    pub pid: ProcessId,
    /// `Name:` from status
    pub command_name: String,
    /// Single-letter scheduler state
    pub state: String,
    /// Allowed CPUs
    pub cpu_affinity: CpuAffinity,
    /// Command line, truncated for display
    pub command_line: String,
}
