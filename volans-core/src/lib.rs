//! volans Core - Foundation types, records, and configuration
//!
//! This crate provides the types shared by the namespace index, the
//! container correlator and the telemetry collectors.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod events;
pub mod records;
pub mod types;

pub use config::{EngineConfig, OwnershipRetention};
pub use error::{Error, Result};
pub use events::EngineEvent;
pub use records::{
    ChannelConfig, ContainerKind, ContainerOwnership, InterfaceStat, LinkFlags,
    NamespaceMembership, NamespaceSummary, OffloadFeatures, ProcessAttributes,
};
pub use types::{CpuAffinity, NamespaceId, NamespaceKind, ProcessId};
