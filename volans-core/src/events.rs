//! Engine events with structured tracing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::NamespaceId;

/// Notable outcomes of scans, syncs and collections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Full scan rebuilt the namespace index
    IndexScanned {
        /// Live processes seen
        processes: usize,
        /// Membership records created
        memberships: usize,
        /// Process/kind pairs that could not be resolved
        skipped: usize,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Reconciliation applied a set difference to the index
    Reconciled {
        /// Processes added
        added: usize,
        /// Processes removed
        removed: usize,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Ownership table synced from the container runtime
    OwnershipSynced {
        /// New pod identities
        inserted: usize,
        /// Pod identities whose pid changed
        updated: usize,
        /// Records removed by retention
        pruned: usize,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Container runtime could not be used; ownership left as is
    RuntimeUnavailable {
        /// Failure description
        reason: String,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// A namespace context could not be entered or timed out
    NamespaceEntryFailed {
        /// Target namespace
        namespace_id: NamespaceId,
        /// Failure description
        reason: String,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },
}

impl EngineEvent {
    /// Build a `Reconciled` event stamped now
    #[must_use]
    pub fn reconciled(added: usize, removed: usize) -> Self {
        Self::Reconciled {
            added,
            removed,
            timestamp: SystemTime::now(),
        }
    }

    /// Build a `RuntimeUnavailable` event stamped now
    #[must_use]
    pub fn runtime_unavailable(reason: impl fmt::Display) -> Self {
        Self::RuntimeUnavailable {
            reason: reason.to_string(),
            timestamp: SystemTime::now(),
        }
    }

    /// Build a `NamespaceEntryFailed` event stamped now
    #[must_use]
    pub fn entry_failed(namespace_id: NamespaceId, reason: impl fmt::Display) -> Self {
        Self::NamespaceEntryFailed {
            namespace_id,
            reason: reason.to_string(),
            timestamp: SystemTime::now(),
        }
    }

    /// Get the timestamp from any event
    #[must_use]
    pub const fn timestamp(&self) -> SystemTime {
        match self {
            Self::IndexScanned { timestamp, .. }
            | Self::Reconciled { timestamp, .. }
            | Self::OwnershipSynced { timestamp, .. }
            | Self::RuntimeUnavailable { timestamp, .. }
            | Self::NamespaceEntryFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Check if this event reports a degraded result
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::RuntimeUnavailable { .. } | Self::NamespaceEntryFailed { .. }
        )
    }

    /// Emit structured tracing event
    pub fn emit_trace(&self) {
        match self {
            Self::IndexScanned {
                processes,
                memberships,
                skipped,
                ..
            } => {
                tracing::info!(
                    processes,
                    memberships,
                    skipped,
                    event = "index_scanned",
                    "Namespace index built"
                );
            }
            Self::Reconciled { added, removed, .. } => {
                if *added == 0 && *removed == 0 {
                    tracing::trace!(event = "reconciled", "Namespace index unchanged");
                } else {
                    tracing::debug!(
                        added,
                        removed,
                        event = "reconciled",
                        "Namespace index reconciled"
                    );
                }
            }
            Self::OwnershipSynced {
                inserted,
                updated,
                pruned,
                ..
            } => {
                tracing::debug!(
                    inserted,
                    updated,
                    pruned,
                    event = "ownership_synced",
                    "Pod ownership synced"
                );
            }
            Self::RuntimeUnavailable { reason, .. } => {
                tracing::warn!(
                    reason = %reason,
                    event = "runtime_unavailable",
                    "Container runtime unavailable, keeping previous ownership"
                );
            }
            Self::NamespaceEntryFailed {
                namespace_id,
                reason,
                ..
            } => {
                tracing::warn!(
                    namespace_id = %namespace_id,
                    reason = %reason,
                    event = "namespace_entry_failed",
                    "Could not enter namespace"
                );
            }
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexScanned {
                processes,
                memberships,
                ..
            } => write!(f, "indexed {memberships} memberships over {processes} processes"),
            Self::Reconciled { added, removed, .. } => {
                write!(f, "reconciled: +{added} -{removed}")
            }
            Self::OwnershipSynced {
                inserted, updated, ..
            } => write!(f, "ownership synced: {inserted} new, {updated} updated"),
            Self::RuntimeUnavailable { reason, .. } => {
                write!(f, "runtime unavailable: {reason}")
            }
            Self::NamespaceEntryFailed {
                namespace_id,
                reason,
                ..
            } => write!(f, "cannot enter namespace {namespace_id}: {reason}"),
        }
    }
}

// Custom SystemTime serialization
mod systemtime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(since_epoch.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}
