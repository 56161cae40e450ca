//! Dump engine for revdump
//!
//! This crate turns a repository's history into a dump stream:
//! - [`RepositoryAccess`] / [`TreeEditSink`]: the seams to a repository backend
//! - [`DumpEditor`]: tree-edit state machine with lazy record emission
//! - [`Dumper`]: revision-range orchestration and renumbering
//! - [`memory::MemoryRepository`]: a backend over an in-memory history

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod dumper;
pub mod editor;
pub mod memory;
pub mod spool;

// Re-export commonly used types
pub use access::{DiffBase, DiffRequest, NodeId, RepositoryAccess, TreeEditSink};
pub use dumper::{diff_base, DumpSummary, Dumper, ExportRoot, ResolvedRange};
pub use editor::DumpEditor;
pub use memory::MemoryRepository;
pub use spool::ContentSpool;
