//! Docker Engine API runtime

use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::{API_DEFAULT_VERSION, Docker};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use volans_core::{Error, Result};

use crate::runtime::{ContainerRuntime, LabelFilter, RuntimeContainer};

fn runtime_error(e: bollard::errors::Error) -> Error {
    Error::Runtime {
        message: e.to_string(),
    }
}

/// Container runtime backed by the Docker daemon's unix socket
///
/// The client is built on first use, so a missing socket surfaces as a
/// runtime error from the call that needed it rather than at construction.
#[derive(Debug)]
pub struct DockerRuntime {
    client: OnceCell<Docker>,
    socket: PathBuf,
    timeout: Duration,
}

impl DockerRuntime {
    /// Describe a daemon listening on `socket`; nothing is opened yet
    #[must_use]
    pub fn new(socket: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            client: OnceCell::new(),
            socket: socket.into(),
            timeout,
        }
    }

    /// Socket the client talks to
    #[must_use]
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    async fn client(&self) -> Result<&Docker> {
        self.client
            .get_or_try_init(|| async {
                let path = self.socket.to_str().ok_or_else(|| Error::Runtime {
                    message: format!("docker socket path is not UTF-8: {}", self.socket.display()),
                })?;

                let client = Docker::connect_with_unix(
                    path,
                    self.timeout.as_secs().max(1),
                    API_DEFAULT_VERSION,
                )
                .map_err(runtime_error)?;

                debug!(socket = %self.socket.display(), "Docker client ready");
                Ok(client)
            })
            .await
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    #[instrument(skip(self), level = "debug")]
    async fn list_containers(&self, filter: &LabelFilter) -> Result<Vec<RuntimeContainer>> {
        let labels = filter.to_docker_filters();
        let mut filters = HashMap::new();
        if !labels.is_empty() {
            filters.insert("label", labels.iter().map(String::as_str).collect());
        }

        let options = ListContainersOptions {
            all: false,
            filters,
            ..Default::default()
        };

        let summaries = self
            .client()
            .await?
            .list_containers(Some(options))
            .await
            .map_err(runtime_error)?;

        Ok(summaries
            .into_iter()
            .filter_map(|summary| {
                Some(RuntimeContainer {
                    id: summary.id?,
                    labels: summary.labels.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn inspect_pid(&self, id: &str) -> Result<Option<i64>> {
        let inspected = self
            .client()
            .await?
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(runtime_error)?;

        Ok(inspected.state.and_then(|state| state.pid))
    }

    async fn ping(&self) -> Result<()> {
        self.client().await?.ping().await.map_err(runtime_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_opens_nothing() {
        let runtime = DockerRuntime::new("/nonexistent/docker.sock", Duration::from_secs(1));
        assert_eq!(runtime.socket(), Path::new("/nonexistent/docker.sock"));
    }

    #[tokio::test]
    async fn test_absent_daemon_is_runtime_error() {
        let runtime = DockerRuntime::new("/nonexistent/docker.sock", Duration::from_secs(1));

        let err = runtime.ping().await.unwrap_err();
        assert!(matches!(err, Error::Runtime { .. }));

        let err = runtime
            .list_containers(&LabelFilter::sandboxes())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Runtime { .. }));
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon"]
    async fn test_lists_from_local_daemon() {
        let runtime = DockerRuntime::new("/var/run/docker.sock", Duration::from_secs(10));

        runtime.ping().await.unwrap();
        runtime
            .list_containers(&LabelFilter::sandboxes())
            .await
            .unwrap();
    }
}
