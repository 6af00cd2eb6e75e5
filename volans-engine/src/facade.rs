//! Query facade over the index, the correlator and the collectors

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};
use volans_container::{ContainerCorrelator, ContainerRuntime, DockerRuntime, SyncReport};
use volans_core::{
    EngineConfig, InterfaceStat, NamespaceId, NamespaceKind, NamespaceSummary, ProcessAttributes,
    Result,
};
use volans_namespace::{NamespaceIndex, ProcFs, ProcessSource};

use crate::network::NetworkCollector;
use crate::process::ProcessCollector;

static ENGINE: OnceCell<Engine> = OnceCell::const_new();

/// Container runtime reachability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuntimeStatus {
    /// Ownership lookups are turned off
    Disabled,
    /// The runtime answered a ping
    Reachable,
    /// The runtime did not answer
    Unreachable {
        /// Failure description
        reason: String,
    },
}

/// Snapshot of the engine's tables and dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineHealth {
    /// Processes in the namespace index
    pub indexed_processes: usize,
    /// Distinct namespace instances
    pub namespaces: usize,
    /// Pod ownership records
    pub ownerships: usize,
    /// Container runtime state
    pub runtime: RuntimeStatus,
}

/// The query engine
///
/// Holds the two persistent tables. Derived rows are computed per call and
/// never cached. Row-producing queries do not fail; an unavailable
/// dependency yields fewer or emptier rows and a warning.
pub struct Engine {
    config: EngineConfig,
    index: NamespaceIndex,
    correlator: ContainerCorrelator,
    network: NetworkCollector,
    processes: ProcessCollector,
    shut_down: AtomicBool,
}

impl Engine {
    /// Build the engine from configuration, then scan and sync
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the process table
    /// cannot be enumerated
    pub async fn init(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let source = Arc::new(ProcFs::new(&config.proc_root));
        let runtime: Option<Arc<dyn ContainerRuntime>> = if config.runtime_enabled {
            Some(Arc::new(DockerRuntime::new(
                &config.docker_socket,
                config.runtime_timeout(),
            )))
        } else {
            None
        };

        Self::with_parts(config, source, runtime).await
    }

    /// Build the engine over explicit sources, then scan and sync
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the process table
    /// cannot be enumerated
    #[instrument(skip_all)]
    pub async fn with_parts(
        config: EngineConfig,
        source: Arc<dyn ProcessSource>,
        runtime: Option<Arc<dyn ContainerRuntime>>,
    ) -> Result<Self> {
        config.validate()?;

        let index = NamespaceIndex::new(source, config.namespace_kinds.clone());
        let correlator = runtime
            .map_or_else(ContainerCorrelator::disabled, ContainerCorrelator::new)
            .with_retention(config.retention)
            .with_timeout(config.runtime_timeout());

        let engine = Self {
            network: NetworkCollector::new(&config.proc_root, config.netns_timeout()),
            processes: ProcessCollector::new(&config.proc_root, config.cmdline_width),
            index,
            correlator,
            config,
            shut_down: AtomicBool::new(false),
        };

        engine.index.full_scan().await?;
        engine.correlator.sync().await;

        let processes = engine.index.len().await;
        let ownerships = engine.correlator.len().await;
        info!(processes, ownerships, "Engine initialized");

        Ok(engine)
    }

    /// Process-wide engine, initialized by the first caller
    ///
    /// Later calls return the same instance and ignore `config`. Concurrent
    /// first calls run `init` once.
    ///
    /// # Errors
    /// Returns error if initialization fails; a later call retries it
    pub async fn global(config: EngineConfig) -> Result<&'static Self> {
        ENGINE.get_or_try_init(|| Self::init(config)).await
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Namespace index
    #[must_use]
    pub const fn index(&self) -> &NamespaceIndex {
        &self.index
    }

    /// Ownership correlator
    #[must_use]
    pub const fn correlator(&self) -> &ContainerCorrelator {
        &self.correlator
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Reconcile the index, then list every namespace with its owning pod
    #[instrument(skip(self))]
    pub async fn list_namespaces(&self) -> Vec<NamespaceSummary> {
        if self.is_shut_down() {
            return Vec::new();
        }

        if let Err(e) = self.index.reconcile().await {
            warn!(error = %e, "Reconcile failed, listing previous index");
        }

        let mut summaries = Vec::new();
        for group in self.index.groups().await {
            let owner_pod = self
                .correlator
                .owner_of(&group.pids)
                .await
                .map(|o| o.pod_label());

            summaries.push(NamespaceSummary {
                namespace_id: group.namespace_id,
                kind: group.kind,
                member_count: group.pids.len(),
                owner_pod,
            });
        }
        summaries
    }

    /// Interfaces of a network namespace
    ///
    /// Empty if the namespace is unknown, not a network namespace, has no
    /// live member, or cannot be entered.
    #[instrument(skip(self))]
    pub async fn get_interfaces(&self, namespace_id: NamespaceId) -> Vec<InterfaceStat> {
        if self.index.kind_of(namespace_id).await != Some(NamespaceKind::Net) {
            return Vec::new();
        }

        let Some(&pid) = self.index.members(namespace_id).await.first() else {
            return Vec::new();
        };

        self.network.collect(namespace_id, pid).await
    }

    /// Attributes of the live processes in a namespace, ascending by pid
    #[instrument(skip(self))]
    pub async fn get_processes(&self, namespace_id: NamespaceId) -> Vec<ProcessAttributes> {
        let members = self.index.members(namespace_id).await;
        self.processes.collect(&members).await
    }

    /// Re-sync pod ownership from the container runtime
    pub async fn refresh_ownership(&self) -> SyncReport {
        if self.is_shut_down() {
            return SyncReport::default();
        }
        self.correlator.sync().await
    }

    /// Table sizes and runtime reachability
    pub async fn health(&self) -> EngineHealth {
        let runtime = match self.correlator.runtime() {
            None => RuntimeStatus::Disabled,
            Some(runtime) => match runtime.ping().await {
                Ok(()) => RuntimeStatus::Reachable,
                Err(e) => RuntimeStatus::Unreachable {
                    reason: e.to_string(),
                },
            },
        };

        EngineHealth {
            indexed_processes: self.index.len().await,
            namespaces: self.index.summaries().await.len(),
            ownerships: self.correlator.len().await,
            runtime,
        }
    }

    /// Drop both tables; later queries return no rows
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        self.index.clear().await;
        self.correlator.clear().await;
        info!("Engine shut down");
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("index", &self.index)
            .field("correlator", &self.correlator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volans_container::MockRuntime;
    use volans_core::ProcessId;
    use volans_namespace::MockProcessSource;

    const POD_NET: NamespaceId = NamespaceId::from_inode(4_026_532_500);
    const HOST_NET: NamespaceId = NamespaceId::from_inode(4_026_531_840);

    async fn fixtures() -> (MockProcessSource, MockRuntime) {
        let source = MockProcessSource::new();
        for pid in [1, 2] {
            source
                .insert(ProcessId::from_raw(pid), NamespaceKind::Net, HOST_NET)
                .await;
        }
        for pid in [100, 101] {
            source
                .insert(ProcessId::from_raw(pid), NamespaceKind::Net, POD_NET)
                .await;
        }

        let runtime = MockRuntime::new();
        runtime.add_sandbox("sb", "default", "web", 100).await;

        (source, runtime)
    }

    async fn engine(source: &MockProcessSource, runtime: &MockRuntime) -> Engine {
        Engine::with_parts(
            EngineConfig::new().with_proc_root("/nonexistent"),
            Arc::new(source.clone()),
            Some(Arc::new(runtime.clone())),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_namespaces_joins_ownership() {
        let (source, runtime) = fixtures().await;
        let engine = engine(&source, &runtime).await;

        let rows = engine.list_namespaces().await;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].namespace_id, HOST_NET);
        assert_eq!(rows[0].member_count, 2);
        assert_eq!(rows[0].owner_pod, None);
        assert_eq!(rows[1].owner_pod.as_deref(), Some("default/web"));
    }

    #[tokio::test]
    async fn test_list_namespaces_reconciles() {
        let (source, runtime) = fixtures().await;
        let engine = engine(&source, &runtime).await;

        source.remove(ProcessId::from_raw(2)).await;
        let rows = engine.list_namespaces().await;

        assert_eq!(rows[0].member_count, 1);
    }

    #[tokio::test]
    async fn test_runtime_down_still_lists() {
        let (source, runtime) = fixtures().await;
        runtime.set_unreachable(true).await;
        let engine = engine(&source, &runtime).await;

        let rows = engine.list_namespaces().await;

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.owner_pod.is_none()));
        assert!(engine.refresh_ownership().await.degraded);
        assert!(matches!(
            engine.health().await.runtime,
            RuntimeStatus::Unreachable { .. }
        ));
    }

    #[tokio::test]
    async fn test_init_fails_without_process_table() {
        let (source, runtime) = fixtures().await;
        source.set_listing_fails(true).await;

        let result = Engine::with_parts(
            EngineConfig::new(),
            Arc::new(source.clone()),
            Some(Arc::new(runtime.clone())),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_namespace_has_no_rows() {
        let (source, runtime) = fixtures().await;
        let engine = engine(&source, &runtime).await;
        let unknown = NamespaceId::from_inode(7);

        assert!(engine.get_interfaces(unknown).await.is_empty());
        assert!(engine.get_processes(unknown).await.is_empty());
    }

    #[tokio::test]
    async fn test_unenterable_namespace_has_no_interfaces() {
        let (source, runtime) = fixtures().await;
        let engine = engine(&source, &runtime).await;

        assert!(engine.get_interfaces(POD_NET).await.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_empties_queries() {
        let (source, runtime) = fixtures().await;
        let engine = engine(&source, &runtime).await;

        engine.shutdown().await;

        assert!(engine.list_namespaces().await.is_empty());
        assert!(engine.get_processes(POD_NET).await.is_empty());
        assert_eq!(engine.refresh_ownership().await, SyncReport::default());

        let health = engine.health().await;
        assert_eq!(health.indexed_processes, 0);
        assert_eq!(health.ownerships, 0);
    }

    #[tokio::test]
    async fn test_without_runtime() {
        let (source, _) = fixtures().await;
        let engine = Engine::with_parts(EngineConfig::new(), Arc::new(source.clone()), None)
            .await
            .unwrap();

        assert_eq!(engine.health().await.runtime, RuntimeStatus::Disabled);
        assert!(engine.list_namespaces().await.iter().all(|r| r.owner_pod.is_none()));
    }
}
