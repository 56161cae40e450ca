//! Convenient imports
//!
//! ```
//! use revdump::prelude::*;
//! ```

pub use revdump_core::{DumpError, DumpOptions, DumpResult, RevisionRange, RevSpec};
pub use revdump_engine::memory::Change;
pub use revdump_engine::{Dumper, MemoryRepository, RepositoryAccess};
