//! Namespace index: which process belongs to which namespace instance

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use volans_core::{
    EngineEvent, NamespaceId, NamespaceKind, NamespaceMembership, NamespaceSummary, ProcessId,
    Result,
};

use crate::source::ProcessSource;

/// Mutations applied by one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Processes newly indexed
    pub added: usize,
    /// Processes dropped because they are no longer live
    pub removed: usize,
    /// Indexed processes that gained a kind unresolvable at first sighting
    pub completed: usize,
}

impl ReconcileReport {
    /// Check if reconciliation changed nothing
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.completed == 0
    }
}

/// Members of one namespace instance as currently indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceGroup {
    /// Namespace instance
    pub namespace_id: NamespaceId,
    /// Namespace kind
    pub kind: NamespaceKind,
    /// Indexed member processes, ascending
    pub pids: Vec<ProcessId>,
}

/// Point-in-time pid → namespace table
///
/// Only [`full_scan`](Self::full_scan) and [`reconcile`](Self::reconcile)
/// write the table; everything else reads it.
pub struct NamespaceIndex {
    source: Arc<dyn ProcessSource>,
    kinds: Vec<NamespaceKind>,
    table: Mutex<BTreeMap<ProcessId, Vec<NamespaceMembership>>>,
}

impl NamespaceIndex {
    /// Create an empty index over `source` for the given kinds
    #[must_use]
    pub fn new(source: Arc<dyn ProcessSource>, kinds: Vec<NamespaceKind>) -> Self {
        Self {
            source,
            kinds,
            table: Mutex::new(BTreeMap::new()),
        }
    }

    /// The process source backing this index
    #[must_use]
    pub fn source(&self) -> &Arc<dyn ProcessSource> {
        &self.source
    }

    /// Indexed namespace kinds
    #[must_use]
    pub fn kinds(&self) -> &[NamespaceKind] {
        &self.kinds
    }

    /// Rebuild the table from every live process
    ///
    /// Unresolvable processes are skipped. Returns the number of memberships.
    ///
    /// # Errors
    /// Returns error only if live processes cannot be enumerated
    #[instrument(skip(self), level = "debug")]
    pub async fn full_scan(&self) -> Result<usize> {
        let live = self.source.live_pids().await?;

        let mut table = BTreeMap::new();
        let mut skipped = 0;
        for &pid in &live {
            let (memberships, failed) = self.resolve(pid).await;
            skipped += failed;
            if !memberships.is_empty() {
                table.insert(pid, memberships);
            }
        }

        let count = table.values().map(Vec::len).sum();
        *self.table.lock().await = table;

        EngineEvent::IndexScanned {
            processes: live.len(),
            memberships: count,
            skipped,
            timestamp: SystemTime::now(),
        }
        .emit_trace();

        Ok(count)
    }

    /// Bring the table in line with the live process set
    ///
    /// Removes `indexed − live`, resolves and adds `live − indexed`, and
    /// retries the missing kinds of live processes indexed with fewer than
    /// every configured kind. Calling it again without OS-level change
    /// mutates nothing.
    ///
    /// # Errors
    /// Returns error if live processes cannot be enumerated; the table is
    /// left untouched in that case
    #[instrument(skip(self), level = "debug")]
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let live = self.source.live_pids().await?;

        let (indexed, incomplete) = {
            let table = self.table.lock().await;
            let indexed: BTreeSet<ProcessId> = table.keys().copied().collect();
            let incomplete: Vec<ProcessId> = table
                .iter()
                .filter(|(pid, memberships)| {
                    memberships.len() < self.kinds.len() && live.contains(pid)
                })
                .map(|(&pid, _)| pid)
                .collect();
            (indexed, incomplete)
        };

        let to_remove: Vec<ProcessId> = indexed.difference(&live).copied().collect();
        let to_add: Vec<ProcessId> = live.difference(&indexed).copied().collect();

        // Resolve outside the lock; links are read from the OS
        let mut resolved = Vec::with_capacity(to_add.len() + incomplete.len());
        for pid in to_add.into_iter().chain(incomplete) {
            let (memberships, _) = self.resolve(pid).await;
            if !memberships.is_empty() {
                resolved.push((pid, memberships));
            }
        }

        let mut table = self.table.lock().await;
        let mut report = ReconcileReport::default();
        for pid in &to_remove {
            if table.remove(pid).is_some() {
                report.removed += 1;
            }
        }
        for (pid, memberships) in resolved {
            match table.get_mut(&pid) {
                None => {
                    table.insert(pid, memberships);
                    report.added += 1;
                }
                Some(existing) if memberships.len() > existing.len() => {
                    *existing = memberships;
                    report.completed += 1;
                }
                Some(_) => {}
            }
        }
        drop(table);

        if report.completed > 0 {
            debug!(completed = report.completed, "Resolved previously missing kinds");
        }
        EngineEvent::reconciled(report.added, report.removed).emit_trace();

        Ok(report)
    }

    /// Resolve every configured kind for one process
    ///
    /// Returns the memberships found and the number of kinds that failed.
    async fn resolve(&self, pid: ProcessId) -> (Vec<NamespaceMembership>, usize) {
        let mut memberships = Vec::with_capacity(self.kinds.len());
        let mut failed = 0;

        for &kind in &self.kinds {
            match self.source.namespace_of(pid, kind).await {
                Ok(namespace_id) => memberships.push(NamespaceMembership {
                    pid,
                    namespace_id,
                    kind,
                }),
                Err(e) => {
                    debug!(pid = %pid, kind = %kind, error = %e, "Skipping unresolvable namespace");
                    failed += 1;
                }
            }
        }

        (memberships, failed)
    }

    /// All membership records, ordered by pid
    pub async fn memberships(&self) -> Vec<NamespaceMembership> {
        self.table
            .lock()
            .await
            .values()
            .flatten()
            .copied()
            .collect()
    }

    /// Number of indexed processes
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    /// Check if nothing is indexed
    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_empty()
    }

    /// Indexed members grouped per namespace instance
    ///
    /// Ordered by (namespace id, kind).
    pub async fn groups(&self) -> Vec<NamespaceGroup> {
        let mut grouped: BTreeMap<(NamespaceId, NamespaceKind), Vec<ProcessId>> = BTreeMap::new();

        for membership in self.table.lock().await.values().flatten() {
            grouped
                .entry((membership.namespace_id, membership.kind))
                .or_default()
                .push(membership.pid);
        }

        grouped
            .into_iter()
            .map(|((namespace_id, kind), pids)| NamespaceGroup {
                namespace_id,
                kind,
                pids,
            })
            .collect()
    }

    /// One row per namespace instance with its member count
    ///
    /// Ownership is not known here; `owner_pod` is always `None`.
    pub async fn summaries(&self) -> Vec<NamespaceSummary> {
        self.groups()
            .await
            .into_iter()
            .map(|group| NamespaceSummary {
                namespace_id: group.namespace_id,
                kind: group.kind,
                member_count: group.pids.len(),
                owner_pod: None,
            })
            .collect()
    }

    /// Member processes of a namespace that are still live, ascending
    pub async fn members(&self, namespace_id: NamespaceId) -> Vec<ProcessId> {
        let indexed: Vec<ProcessId> = self
            .table
            .lock()
            .await
            .values()
            .flatten()
            .filter(|m| m.namespace_id == namespace_id)
            .map(|m| m.pid)
            .collect();

        let mut live = Vec::with_capacity(indexed.len());
        for pid in indexed {
            if self.source.is_live(pid).await {
                live.push(pid);
            }
        }
        live.sort_unstable();
        live.dedup();
        live
    }

    /// Kind of an indexed namespace instance
    pub async fn kind_of(&self, namespace_id: NamespaceId) -> Option<NamespaceKind> {
        self.table
            .lock()
            .await
            .values()
            .flatten()
            .find(|m| m.namespace_id == namespace_id)
            .map(|m| m.kind)
    }

    /// Drop every record
    pub async fn clear(&self) {
        self.table.lock().await.clear();
    }
}

impl std::fmt::Debug for NamespaceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceIndex")
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}
