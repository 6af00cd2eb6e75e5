//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use volans_core::NamespaceId;

#[derive(Parser)]
#[command(name = "volans")]
#[command(about = "Namespace, pod and network inspector", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// procfs mount point (e.g. /host/proc)
    #[arg(long, global = true)]
    pub proc_root: Option<PathBuf>,

    /// Docker Engine API socket
    #[arg(long, global = true)]
    pub docker_socket: Option<PathBuf>,

    /// Do not query the container runtime
    #[arg(long, global = true)]
    pub no_runtime: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List namespaces with member counts and owning pods
    Namespaces,

    /// Show interfaces of a network namespace
    Interfaces {
        /// Namespace id (inode or net:[inode])
        namespace: NamespaceId,
    },

    /// Show processes of a namespace
    Processes {
        /// Namespace id (inode or net:[inode])
        namespace: NamespaceId,
    },

    /// Show interfaces and processes of a namespace
    Inspect {
        /// Namespace id (inode or net:[inode])
        namespace: NamespaceId,
    },

    /// Check procfs, privileges and runtime reachability
    Health,
}
