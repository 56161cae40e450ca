//! Core types for revdump
//!
//! This crate defines the data model shared by every other revdump crate:
//! - [`RevisionMetadata`]: author, date and log message of one source revision
//! - [`NodeKind`] / [`NodeAction`]: what a node record describes
//! - [`PropertySet`]: ordered, duplicate-free property mapping
//! - [`DumpOptions`] / [`RevisionRange`]: configuration of one export run
//! - [`DumpError`]: the single error type used across the workspace

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod options;
pub mod property;
pub mod types;

pub use error::{DumpError, DumpResult};
pub use options::{DumpOptions, OutputTarget, RevSpec, RevisionRange, SessionConfig};
pub use property::PropertySet;
pub use types::{NodeAction, NodeKind, Revnum, RevisionMetadata};
