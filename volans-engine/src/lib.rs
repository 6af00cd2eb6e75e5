//! Namespace, process and network telemetry queries
//!
//! This crate ties the namespace index and the ownership correlator to the
//! telemetry collectors:
//! - Namespace list with owning pods
//! - Interface counters, addresses and driver features per network namespace
//! - Process attributes per namespace

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod ethtool;
pub mod facade;
pub mod link;
pub mod netdev;
pub mod network;
pub mod process;

pub use facade::{Engine, EngineHealth, RuntimeStatus};
pub use link::LinkSnapshot;
pub use netdev::InterfaceCounters;
pub use network::{join_interfaces, NetworkCollector};
pub use process::ProcessCollector;

// Re-export commonly used types
pub use volans_container::SyncReport;
pub use volans_core::{
    EngineConfig, InterfaceStat, NamespaceId, NamespaceSummary, ProcessAttributes,
};
