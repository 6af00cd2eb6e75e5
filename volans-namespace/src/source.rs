//! Process source trait for pluggable implementations

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use procfs::process::all_processes_with_root;
use tokio::fs;
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use tracing::debug;
use volans_core::{Error, NamespaceId, NamespaceKind, ProcessId, Result};

/// Trait for enumerating processes and resolving their namespaces
///
/// This allows for different implementations:
/// - [`ProcFs`] - Production, reads a procfs mount
/// - [`MockProcessSource`] - Testing without a real process table
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ProcessSource: Send + Sync {
    /// List the identifiers of all currently live processes
    ///
    /// # Errors
    /// Returns error if the process table cannot be read at all
    async fn live_pids(&self) -> Result<BTreeSet<ProcessId>>;

    /// Resolve the namespace instance a process belongs to
    ///
    /// # Errors
    /// Returns error if the process exited or its link is unreadable
    async fn namespace_of(&self, pid: ProcessId, kind: NamespaceKind) -> Result<NamespaceId>;

    /// Check whether a process is still live
    async fn is_live(&self, pid: ProcessId) -> bool;

    /// Path of the namespace handle that setns(2) can open
    fn namespace_path(&self, pid: ProcessId, kind: NamespaceKind) -> PathBuf;
}

/// procfs-backed process source
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    /// Create a source reading the procfs mounted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// procfs mount point
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one process
    #[must_use]
    pub fn pid_dir(&self, pid: ProcessId) -> PathBuf {
        self.root.join(pid.to_string())
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[async_trait]
impl ProcessSource for ProcFs {
    async fn live_pids(&self) -> Result<BTreeSet<ProcessId>> {
        let root = self.root.clone();
        let pids = spawn_blocking(move || -> Result<BTreeSet<ProcessId>> {
            // Entries that vanish between listing and opening are skipped
            Ok(all_processes_with_root(&root)?
                .filter_map(std::result::Result::ok)
                .map(|process| ProcessId::from_raw(process.pid()))
                .collect())
        })
        .await??;

        debug!(root = %self.root.display(), count = pids.len(), "Listed live processes");

        Ok(pids)
    }

    async fn namespace_of(&self, pid: ProcessId, kind: NamespaceKind) -> Result<NamespaceId> {
        let link = fs::read_link(self.namespace_path(pid, kind)).await?;
        let link = link.to_string_lossy();

        let (found, id) = NamespaceId::parse_link(&link)?;
        if found != kind {
            return Err(Error::Namespace {
                message: format!("expected {kind} link for pid {pid}, found {link}"),
            });
        }

        Ok(id)
    }

    async fn is_live(&self, pid: ProcessId) -> bool {
        fs::metadata(self.pid_dir(pid)).await.is_ok()
    }

    fn namespace_path(&self, pid: ProcessId, kind: NamespaceKind) -> PathBuf {
        self.pid_dir(pid).join("ns").join(kind.as_str())
    }
}

/// Mock process source for testing (doesn't touch procfs)
///
/// # Example
/// ```
/// use volans_core::{NamespaceId, NamespaceKind, ProcessId};
/// use volans_namespace::{MockProcessSource, ProcessSource};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let source = MockProcessSource::new();
/// source
///     .insert(ProcessId::from_raw(1), NamespaceKind::Net, NamespaceId::from_inode(10))
///     .await;
///
/// let pids = source.live_pids().await.unwrap();
/// assert_eq!(pids.len(), 1);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MockProcessSource {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    processes: BTreeMap<ProcessId, BTreeMap<NamespaceKind, NamespaceId>>,
    listing_fails: bool,
    resolve_calls: usize,
}

impl MockProcessSource {
    /// Create a new, empty mock source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live process with one namespace link
    pub async fn insert(&self, pid: ProcessId, kind: NamespaceKind, namespace_id: NamespaceId) {
        self.state
            .lock()
            .await
            .processes
            .entry(pid)
            .or_default()
            .insert(kind, namespace_id);
    }

    /// Add a live process whose namespace links cannot be resolved
    pub async fn insert_unresolvable(&self, pid: ProcessId) {
        self.state.lock().await.processes.entry(pid).or_default();
    }

    /// Simulate a process exiting
    pub async fn remove(&self, pid: ProcessId) {
        self.state.lock().await.processes.remove(&pid);
    }

    /// Make `live_pids` fail (for testing)
    pub async fn set_listing_fails(&self, fails: bool) {
        self.state.lock().await.listing_fails = fails;
    }

    /// Number of `namespace_of` calls made (for testing)
    pub async fn resolve_calls(&self) -> usize {
        self.state.lock().await.resolve_calls
    }
}

impl std::fmt::Debug for MockProcessSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProcessSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl ProcessSource for MockProcessSource {
    async fn live_pids(&self) -> Result<BTreeSet<ProcessId>> {
        let state = self.state.lock().await;
        if state.listing_fails {
            return Err(Error::PermissionDenied {
                operation: "Mock: list processes".to_string(),
            });
        }
        Ok(state.processes.keys().copied().collect())
    }

    async fn namespace_of(&self, pid: ProcessId, kind: NamespaceKind) -> Result<NamespaceId> {
        let mut state = self.state.lock().await;
        state.resolve_calls += 1;

        state
            .processes
            .get(&pid)
            .and_then(|links| links.get(&kind))
            .copied()
            .ok_or_else(|| Error::Namespace {
                message: format!("Mock: no {kind} link for pid {pid}"),
            })
    }

    async fn is_live(&self, pid: ProcessId) -> bool {
        self.state.lock().await.processes.contains_key(&pid)
    }

    fn namespace_path(&self, pid: ProcessId, kind: NamespaceKind) -> PathBuf {
        PathBuf::from(format!("/mock/{pid}/ns/{kind}"))
    }
}
