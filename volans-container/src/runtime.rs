//! Container runtime trait for pluggable implementations

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use volans_core::{ContainerKind, Error, Result};

/// Label carrying the container role
pub const TYPE_LABEL: &str = "io.kubernetes.docker.type";

/// Label carrying the Kubernetes namespace of the pod
pub const POD_NAMESPACE_LABEL: &str = "io.kubernetes.pod.namespace";

/// Label carrying the pod name
pub const POD_NAME_LABEL: &str = "io.kubernetes.pod.name";

/// A running container as listed by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContainer {
    /// Runtime container id
    pub id: String,
    /// Container labels
    pub labels: HashMap<String, String>,
}

impl RuntimeContainer {
    /// Value of one label
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Container role from its type label
    #[must_use]
    pub fn kind(&self) -> Option<ContainerKind> {
        self.label(TYPE_LABEL).and_then(ContainerKind::from_label)
    }

    /// Pod namespace and name, when both labels are present and non-empty
    #[must_use]
    pub fn pod_identity(&self) -> Option<(&str, &str)> {
        let namespace = self.label(POD_NAMESPACE_LABEL).filter(|s| !s.is_empty())?;
        let name = self.label(POD_NAME_LABEL).filter(|s| !s.is_empty())?;
        Some((namespace, name))
    }
}

/// Exact-match label filter for container listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFilter {
    labels: BTreeMap<String, String>,
}

impl LabelFilter {
    /// Filter matching every container
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching pod sandbox containers
    #[must_use]
    pub fn sandboxes() -> Self {
        Self::new().with_label(TYPE_LABEL, ContainerKind::Sandbox.label_value())
    }

    /// Require `key=value`
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Filters in Docker's `label=key=value` form
    #[must_use]
    pub fn to_docker_filters(&self) -> Vec<String> {
        self.labels.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Check a container's labels against the filter
    #[must_use]
    pub fn matches(&self, container: &RuntimeContainer) -> bool {
        self.labels
            .iter()
            .all(|(k, v)| container.label(k) == Some(v.as_str()))
    }
}

/// Trait for container runtimes
///
/// This allows for different implementations:
/// - [`DockerRuntime`](crate::DockerRuntime) - Production, Docker Engine API
/// - [`MockRuntime`] - Testing without a daemon
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List running containers matching `filter`
    ///
    /// # Errors
    /// Returns error if the runtime is unreachable
    async fn list_containers(&self, filter: &LabelFilter) -> Result<Vec<RuntimeContainer>>;

    /// Current pid of a container's main process, `None` if not running
    ///
    /// # Errors
    /// Returns error if the container cannot be inspected
    async fn inspect_pid(&self, id: &str) -> Result<Option<i64>>;

    /// Check that the runtime answers
    ///
    /// # Errors
    /// Returns error if the runtime is unreachable
    async fn ping(&self) -> Result<()>;
}

/// Mock runtime for testing (doesn't talk to a daemon)
///
/// # Example
/// ```
/// use volans_container::{ContainerRuntime, LabelFilter, MockRuntime};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let runtime = MockRuntime::new();
/// runtime.add_sandbox("abc", "default", "web", 100).await;
///
/// let listed = runtime.list_containers(&LabelFilter::sandboxes()).await.unwrap();
/// assert_eq!(listed.len(), 1);
/// assert_eq!(runtime.inspect_pid("abc").await.unwrap(), Some(100));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    containers: BTreeMap<String, MockContainer>,
    unreachable: bool,
    delay: Option<Duration>,
    list_calls: usize,
}

struct MockContainer {
    labels: HashMap<String, String>,
    pid: Option<i64>,
    inspect_fails: bool,
}

impl MockRuntime {
    /// Create a new mock runtime with no containers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pod sandbox container
    pub async fn add_sandbox(&self, id: &str, pod_namespace: &str, pod_name: &str, pid: i64) {
        let labels = HashMap::from([
            (TYPE_LABEL.to_string(), "podsandbox".to_string()),
            (POD_NAMESPACE_LABEL.to_string(), pod_namespace.to_string()),
            (POD_NAME_LABEL.to_string(), pod_name.to_string()),
        ]);
        self.add_container(id, labels, Some(pid)).await;
    }

    /// Add a container with arbitrary labels
    pub async fn add_container(&self, id: &str, labels: HashMap<String, String>, pid: Option<i64>) {
        self.state.lock().await.containers.insert(
            id.to_string(),
            MockContainer {
                labels,
                pid,
                inspect_fails: false,
            },
        );
    }

    /// Change the pid reported for a container (simulates a restart)
    pub async fn set_pid(&self, id: &str, pid: i64) {
        if let Some(container) = self.state.lock().await.containers.get_mut(id) {
            container.pid = Some(pid);
        }
    }

    /// Make inspecting one container fail
    pub async fn fail_inspect(&self, id: &str) {
        if let Some(container) = self.state.lock().await.containers.get_mut(id) {
            container.inspect_fails = true;
        }
    }

    /// Remove a container
    pub async fn remove(&self, id: &str) {
        self.state.lock().await.containers.remove(id);
    }

    /// Simulate the daemon being down
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().await.unreachable = unreachable;
    }

    /// Delay every listing (for timeout testing)
    pub async fn set_delay(&self, delay: Duration) {
        self.state.lock().await.delay = Some(delay);
    }

    /// Number of listings made (for testing)
    pub async fn list_calls(&self) -> usize {
        self.state.lock().await.list_calls
    }

    fn unreachable_error() -> Error {
        Error::Runtime {
            message: "Mock: runtime unreachable".to_string(),
        }
    }
}

impl std::fmt::Debug for MockRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRuntime").finish_non_exhaustive()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn list_containers(&self, filter: &LabelFilter) -> Result<Vec<RuntimeContainer>> {
        let delay = {
            let mut state = self.state.lock().await;
            state.list_calls += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().await;
        if state.unreachable {
            return Err(Self::unreachable_error());
        }

        let listed: Vec<RuntimeContainer> = state
            .containers
            .iter()
            .map(|(id, c)| RuntimeContainer {
                id: id.clone(),
                labels: c.labels.clone(),
            })
            .filter(|c| filter.matches(c))
            .collect();

        tracing::debug!(count = listed.len(), "Mock: Listed containers");

        Ok(listed)
    }

    async fn inspect_pid(&self, id: &str) -> Result<Option<i64>> {
        let state = self.state.lock().await;
        if state.unreachable {
            return Err(Self::unreachable_error());
        }

        match state.containers.get(id) {
            Some(c) if !c.inspect_fails => Ok(c.pid),
            _ => Err(Error::Runtime {
                message: format!("Mock: no such container: {id}"),
            }),
        }
    }

    async fn ping(&self) -> Result<()> {
        if self.state.lock().await.unreachable {
            return Err(Self::unreachable_error());
        }
        Ok(())
    }
}
