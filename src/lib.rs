//! # revdump
//!
//! Export the history of a repository tree into a dump stream that a
//! compatible loader replays to rebuild the repository.
//!
//! ## Quick Start
//!
//! ```
//! use revdump::prelude::*;
//!
//! let mut repo = MemoryRepository::new().with_uuid(None);
//! repo.commit(vec![Change::add_file("hello.txt", "hi\n")])?;
//!
//! let mut out = Vec::new();
//! let summary = Dumper::new(&mut repo, DumpOptions::new()).run(&mut out)?;
//! assert_eq!(summary.revisions_dumped, 2);
//! assert!(String::from_utf8_lossy(&out).contains("Node-path: hello.txt\n"));
//! # Ok::<(), revdump::DumpError>(())
//! ```
//!
//! ## Crates
//!
//! - `revdump-core`: revisions, nodes, properties, options and errors
//! - `revdump-wire`: property codec and record writer
//! - `revdump-engine`: tree-edit state machine, orchestrator and the
//!   in-memory repository backend

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod prelude;

pub use revdump_core::{
    DumpError, DumpOptions, DumpResult, NodeAction, NodeKind, OutputTarget, PropertySet, RevSpec,
    RevisionMetadata, RevisionRange, Revnum, SessionConfig,
};
pub use revdump_engine::{
    memory, DiffBase, DiffRequest, DumpEditor, DumpSummary, Dumper, MemoryRepository, NodeId,
    RepositoryAccess, TreeEditSink,
};
pub use revdump_wire::{DumpWriter, PathRules};
