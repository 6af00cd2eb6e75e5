//! Namespace indexing and namespace-context entry
//!
//! This crate tracks which processes belong to which namespace instance:
//! - [`ProcessSource`] - enumerates processes and reads their namespace links
//! - [`NamespaceIndex`] - pid → namespace table with set-difference reconcile
//! - [`run_in_namespace`] - scoped setns(2) on a dedicated thread

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod index;
pub mod netns;
pub mod source;

pub use index::{NamespaceGroup, NamespaceIndex, ReconcileReport};
pub use netns::{run_in_namespace, NamespaceGuard, NAMESPACE_THREAD_NAME};
pub use source::{MockProcessSource, ProcFs, ProcessSource};
