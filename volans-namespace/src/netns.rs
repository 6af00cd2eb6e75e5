//! Scoped entry into another process's namespace
//!
//! setns(2) switches the calling thread only, so work inside a foreign
//! namespace runs on a dedicated OS thread and never on a tokio worker.

use nix::sched::setns;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error};
use volans_core::{Error, NamespaceKind, Result};

/// Name of threads that enter foreign namespaces
pub const NAMESPACE_THREAD_NAME: &str = "volans-netns";

/// Holds the calling thread inside a foreign namespace
///
/// The original namespace is restored by [`restore`](Self::restore), or on
/// drop if the guard goes out of scope first.
#[derive(Debug)]
pub struct NamespaceGuard {
    original: File,
    kind: NamespaceKind,
    restored: bool,
}

impl NamespaceGuard {
    /// Move the calling thread into the namespace behind `target`
    ///
    /// # Errors
    /// Returns error if either handle cannot be opened or setns(2) fails
    pub fn enter(target: &Path, kind: NamespaceKind) -> Result<Self> {
        let original = File::open(format!("/proc/thread-self/ns/{kind}"))?;
        let handle = File::open(target)?;

        setns(&handle, kind.clone_flag()).map_err(|e| Error::Namespace {
            message: format!("setns into {} failed: {e}", target.display()),
        })?;

        debug!(target = %target.display(), kind = %kind, "Entered namespace");

        Ok(Self {
            original,
            kind,
            restored: false,
        })
    }

    /// Switch back to the namespace the thread started in
    ///
    /// # Errors
    /// Returns error if setns(2) back fails; the thread must not be reused
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.switch_back()
    }

    fn switch_back(&self) -> Result<()> {
        setns(&self.original, self.kind.clone_flag()).map_err(|e| Error::Namespace {
            message: format!("restoring original {} namespace failed: {e}", self.kind),
        })
    }
}

impl Drop for NamespaceGuard {
    fn drop(&mut self) {
        if !self.restored
            && let Err(e) = self.switch_back()
        {
            error!(error = %e, "Thread left in foreign namespace");
        }
    }
}

/// Run `f` inside the namespace behind `target` and return its result
///
/// `f` runs on a fresh thread named [`NAMESPACE_THREAD_NAME`]. If it has not
/// finished within `timeout` the call fails; the thread is left to finish on
/// its own and its result is discarded.
///
/// # Errors
/// Returns error if the namespace cannot be entered or restored, if `f`
/// fails, or on timeout
pub async fn run_in_namespace<F, T>(
    target: PathBuf,
    kind: NamespaceKind,
    timeout: Duration,
    f: F,
) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let display = target.display().to_string();

    thread::Builder::new()
        .name(NAMESPACE_THREAD_NAME.to_string())
        .spawn(move || {
            let result = (|| -> Result<T> {
                let guard = NamespaceGuard::enter(&target, kind)?;
                let output = f();
                guard.restore()?;
                output
            })();
            // Receiver is gone after a timeout
            let _ = tx.send(result);
        })?;

    match tokio::time::timeout(timeout, rx).await {
        Ok(received) => received?,
        Err(_) => Err(Error::Timeout {
            operation: format!("work inside {display} after {}s", timeout.as_secs()),
        }),
    }
}
