//! Pod ownership from the container runtime with pluggable backends
//!
//! This crate provides a trait-based abstraction over the container runtime
//! and the correlator that maps pod sandboxes to the processes holding their
//! namespaces.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod correlator;
pub mod docker;
pub mod runtime;

pub use correlator::{ContainerCorrelator, SyncReport};
pub use docker::DockerRuntime;
pub use runtime::{
    ContainerRuntime, LabelFilter, MockRuntime, RuntimeContainer, POD_NAMESPACE_LABEL,
    POD_NAME_LABEL, TYPE_LABEL,
};

// Re-export commonly used types
pub use volans_core::{ContainerKind, ContainerOwnership, OwnershipRetention};
