//! Pod ownership table fed from the container runtime

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use volans_core::{
    ContainerKind, ContainerOwnership, EngineEvent, OwnershipRetention, ProcessId, Result,
};

use crate::runtime::{ContainerRuntime, LabelFilter};

/// Outcome of one sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// New pod identities recorded
    pub inserted: usize,
    /// Pod identities whose pid was overwritten
    pub updated: usize,
    /// Records removed by retention
    pub pruned: usize,
    /// Containers ignored (no pid, missing labels, failed inspect)
    pub skipped: usize,
    /// The runtime could not be used; nothing changed
    pub degraded: bool,
}

type PodKey = (String, String);

/// Correlates pod sandboxes with the processes that hold their namespaces
///
/// Records are unique by (pod namespace, pod name). A sync overwrites the pid
/// of a known pod and never duplicates it.
pub struct ContainerCorrelator {
    runtime: Option<Arc<dyn ContainerRuntime>>,
    retention: OwnershipRetention,
    timeout: Duration,
    table: Mutex<BTreeMap<PodKey, ContainerOwnership>>,
}

impl ContainerCorrelator {
    /// Create a correlator backed by `runtime`
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
            retention: OwnershipRetention::default(),
            timeout: Duration::from_secs(10),
            table: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create a correlator with no runtime; ownership stays empty
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            runtime: None,
            retention: OwnershipRetention::default(),
            timeout: Duration::from_secs(10),
            table: Mutex::new(BTreeMap::new()),
        }
    }

    /// Set the retention policy
    #[must_use]
    pub const fn with_retention(mut self, retention: OwnershipRetention) -> Self {
        self.retention = retention;
        self
    }

    /// Set the bound on one sync
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The runtime in use, if any
    #[must_use]
    pub fn runtime(&self) -> Option<&Arc<dyn ContainerRuntime>> {
        self.runtime.as_ref()
    }

    /// Pull sandboxes from the runtime and upsert their ownership
    ///
    /// An unreachable or slow runtime leaves the table as it was.
    #[instrument(skip(self), level = "debug")]
    pub async fn sync(&self) -> SyncReport {
        let Some(runtime) = &self.runtime else {
            debug!("Container runtime disabled, skipping ownership sync");
            return SyncReport::default();
        };

        let observed = match tokio::time::timeout(self.timeout, observe(runtime.as_ref())).await {
            Ok(Ok(observed)) => observed,
            Ok(Err(e)) => return degraded(e),
            Err(_) => {
                return degraded(format!(
                    "ownership sync timed out after {}s",
                    self.timeout.as_secs()
                ));
            }
        };

        self.apply(observed).await
    }

    async fn apply(&self, observed: Observation) -> SyncReport {
        let mut report = SyncReport {
            skipped: observed.skipped,
            ..SyncReport::default()
        };
        let mut seen = BTreeSet::new();

        let mut table = self.table.lock().await;
        for ownership in observed.ownerships {
            let key = (ownership.pod_namespace.clone(), ownership.pod_name.clone());
            seen.insert(key.clone());

            match table.get_mut(&key) {
                Some(existing) if existing.pid != ownership.pid => {
                    debug!(
                        pod = %existing.pod_label(),
                        old_pid = %existing.pid,
                        new_pid = %ownership.pid,
                        "Pod restarted"
                    );
                    existing.pid = ownership.pid;
                    report.updated += 1;
                }
                Some(_) => {}
                None => {
                    table.insert(key, ownership);
                    report.inserted += 1;
                }
            }
        }

        if self.retention == OwnershipRetention::PruneUnobserved {
            let before = table.len();
            table.retain(|key, _| seen.contains(key));
            report.pruned = before - table.len();
        }
        drop(table);

        EngineEvent::OwnershipSynced {
            inserted: report.inserted,
            updated: report.updated,
            pruned: report.pruned,
            timestamp: SystemTime::now(),
        }
        .emit_trace();

        report
    }

    /// All ownership records, ordered by pod identity
    pub async fn ownerships(&self) -> Vec<ContainerOwnership> {
        self.table.lock().await.values().cloned().collect()
    }

    /// Owner among `pids`; the record with the lowest pid wins
    pub async fn owner_of(&self, pids: &[ProcessId]) -> Option<ContainerOwnership> {
        self.table
            .lock()
            .await
            .values()
            .filter(|o| pids.contains(&o.pid))
            .min_by_key(|o| o.pid)
            .cloned()
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    /// Check if no ownership is known
    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_empty()
    }

    /// Drop every record
    pub async fn clear(&self) {
        self.table.lock().await.clear();
    }
}

impl std::fmt::Debug for ContainerCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerCorrelator")
            .field("enabled", &self.runtime.is_some())
            .field("retention", &self.retention)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

struct Observation {
    ownerships: Vec<ContainerOwnership>,
    skipped: usize,
}

async fn observe(runtime: &dyn ContainerRuntime) -> Result<Observation> {
    let containers = runtime.list_containers(&LabelFilter::sandboxes()).await?;

    let mut ownerships = Vec::with_capacity(containers.len());
    let mut skipped = 0;

    for container in containers {
        // Servers may ignore filters; check the role again
        if container.kind() != Some(ContainerKind::Sandbox) {
            skipped += 1;
            continue;
        }

        let Some((pod_namespace, pod_name)) = container.pod_identity() else {
            debug!(id = %container.id, "Sandbox without pod labels");
            skipped += 1;
            continue;
        };

        let pid = match runtime.inspect_pid(&container.id).await {
            Ok(Some(pid)) if pid > 0 => i32::try_from(pid).ok().map(ProcessId::from_raw),
            Ok(_) => None,
            Err(e) => {
                debug!(id = %container.id, error = %e, "Inspect failed");
                None
            }
        };
        let Some(pid) = pid else {
            skipped += 1;
            continue;
        };

        ownerships.push(ContainerOwnership {
            pid,
            pod_namespace: pod_namespace.to_string(),
            pod_name: pod_name.to_string(),
            kind: ContainerKind::Sandbox,
        });
    }

    Ok(Observation {
        ownerships,
        skipped,
    })
}

fn degraded(reason: impl std::fmt::Display) -> SyncReport {
    EngineEvent::runtime_unavailable(reason).emit_trace();
    SyncReport {
        degraded: true,
        ..SyncReport::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, TYPE_LABEL};
    use std::collections::HashMap;

    fn correlator(runtime: &MockRuntime) -> ContainerCorrelator {
        ContainerCorrelator::new(Arc::new(runtime.clone()))
    }

    #[tokio::test]
    async fn test_upsert_overwrites_pid() {
        let runtime = MockRuntime::new();
        runtime.add_sandbox("a", "default", "web", 100).await;
        let correlator = correlator(&runtime);

        let first = correlator.sync().await;
        assert_eq!(first.inserted, 1);

        runtime.set_pid("a", 200).await;
        let second = correlator.sync().await;
        assert_eq!(second.updated, 1);
        assert_eq!(second.inserted, 0);

        let records = correlator.ownerships().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, ProcessId::from_raw(200));
        assert_eq!(records[0].pod_label(), "default/web");
    }

    #[tokio::test]
    async fn test_resync_without_change_is_quiet() {
        let runtime = MockRuntime::new();
        runtime.add_sandbox("a", "default", "web", 100).await;
        let correlator = correlator(&runtime);

        correlator.sync().await;
        let report = correlator.sync().await;

        assert_eq!(report, SyncReport::default());
    }

    #[tokio::test]
    async fn test_skips_unusable_containers() {
        let runtime = MockRuntime::new();
        runtime.add_sandbox("ok", "default", "web", 100).await;
        runtime.add_sandbox("stopped", "default", "db", 0).await;
        runtime.add_sandbox("broken", "kube-system", "dns", 300).await;
        runtime.fail_inspect("broken").await;
        runtime
            .add_container(
                "unlabeled",
                HashMap::from([(TYPE_LABEL.to_string(), "podsandbox".to_string())]),
                Some(400),
            )
            .await;

        let report = correlator(&runtime).sync().await;

        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 3);
    }

    #[tokio::test]
    async fn test_unreachable_runtime_keeps_records() {
        let runtime = MockRuntime::new();
        runtime.add_sandbox("a", "default", "web", 100).await;
        let correlator =
            correlator(&runtime).with_retention(OwnershipRetention::PruneUnobserved);
        correlator.sync().await;

        runtime.set_unreachable(true).await;
        let report = correlator.sync().await;

        assert!(report.degraded);
        assert_eq!(report.pruned, 0);
        assert_eq!(correlator.len().await, 1);
    }

    #[tokio::test]
    async fn test_retention_policies() {
        let runtime = MockRuntime::new();
        runtime.add_sandbox("a", "default", "web", 100).await;
        runtime.add_sandbox("b", "default", "db", 101).await;

        let keep = correlator(&runtime);
        let prune = correlator(&runtime).with_retention(OwnershipRetention::PruneUnobserved);
        keep.sync().await;
        prune.sync().await;

        runtime.remove("b").await;

        assert_eq!(keep.sync().await.pruned, 0);
        assert_eq!(keep.len().await, 2);

        assert_eq!(prune.sync().await.pruned, 1);
        assert_eq!(prune.len().await, 1);
    }

    #[tokio::test]
    async fn test_sync_timeout() {
        let runtime = MockRuntime::new();
        runtime.add_sandbox("a", "default", "web", 100).await;
        runtime.set_delay(Duration::from_millis(500)).await;

        let correlator = correlator(&runtime).with_timeout(Duration::from_millis(20));
        let report = correlator.sync().await;

        assert!(report.degraded);
        assert!(correlator.is_empty().await);
    }

    #[tokio::test]
    async fn test_owner_lowest_pid_wins() {
        let runtime = MockRuntime::new();
        runtime.add_sandbox("a", "default", "web", 300).await;
        runtime.add_sandbox("b", "default", "web-twin", 200).await;
        let correlator = correlator(&runtime);
        correlator.sync().await;

        let pids = [300, 200, 50].map(ProcessId::from_raw);
        let owner = correlator.owner_of(&pids).await.unwrap();
        assert_eq!(owner.pod_name, "web-twin");

        assert!(correlator.owner_of(&[ProcessId::from_raw(1)]).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_correlator() {
        let correlator = ContainerCorrelator::disabled();

        assert_eq!(correlator.sync().await, SyncReport::default());
        assert!(correlator.runtime().is_none());
    }
}
