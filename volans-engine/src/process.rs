//! Per-process attributes from procfs

use procfs::process::Process;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, warn};
use volans_core::{CpuAffinity, Error, ProcessAttributes, ProcessId, Result};

/// Command line arguments joined with single spaces
#[must_use]
pub fn join_cmdline(args: &[String]) -> String {
    args.join(" ").trim().to_string()
}

/// Cut `text` to at most `width` characters
#[must_use]
pub fn truncate_chars(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Read status, stat and cmdline of the process directory `pid_dir`
///
/// # Errors
/// Returns error if any of the three files is unreadable or malformed
pub fn read_attributes(pid_dir: &Path, cmdline_width: usize) -> Result<ProcessAttributes> {
    let process = Process::new_with_root(pid_dir.to_path_buf())?;

    let status = process.status()?;
    let stat = process.stat()?;
    let args = process.cmdline()?;

    let words = status
        .cpus_allowed
        .ok_or_else(|| Error::parse(format!("pid {} status without Cpus_allowed", process.pid())))?;

    Ok(ProcessAttributes {
        pid: ProcessId::from_raw(process.pid()),
        command_name: status.name,
        state: stat.state.to_string(),
        cpu_affinity: CpuAffinity::from_words(words),
        command_line: truncate_chars(&join_cmdline(&args), cmdline_width),
    })
}

/// Reads status, stat and cmdline for namespace members
#[derive(Debug, Clone)]
pub struct ProcessCollector {
    proc_root: PathBuf,
    cmdline_width: usize,
}

impl ProcessCollector {
    /// Create a collector reading the procfs at `proc_root`
    #[must_use]
    pub fn new(proc_root: impl Into<PathBuf>, cmdline_width: usize) -> Self {
        Self {
            proc_root: proc_root.into(),
            cmdline_width,
        }
    }

    /// Attributes of one process
    ///
    /// # Errors
    /// Returns error if any of the three files is unreadable or malformed
    pub async fn attributes(&self, pid: ProcessId) -> Result<ProcessAttributes> {
        let pid_dir = self.proc_root.join(pid.to_string());
        let width = self.cmdline_width;
        spawn_blocking(move || read_attributes(&pid_dir, width)).await?
    }

    /// Attributes of every readable process in `pids`, ascending by pid
    pub async fn collect(&self, pids: &[ProcessId]) -> Vec<ProcessAttributes> {
        let mut sorted = pids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let root = self.proc_root.clone();
        let width = self.cmdline_width;
        let rows = spawn_blocking(move || {
            sorted
                .into_iter()
                .filter_map(|pid| match read_attributes(&root.join(pid.to_string()), width) {
                    Ok(attrs) => Some(attrs),
                    Err(e) => {
                        debug!(pid = %pid, error = %e, "Skipping unreadable process");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .await;

        rows.unwrap_or_else(|e| {
            warn!(error = %e, "Process collection task failed");
            Vec::new()
        })
    }
}
