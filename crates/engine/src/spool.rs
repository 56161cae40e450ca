//! Scratch storage for file content
//!
//! Content streamed in through `apply_content` is buffered in an anonymous
//! temporary file in the scratch directory until the node's record is
//! written. The file has no name on disk and is released when the spool is
//! dropped, on success and on abort alike.

use revdump_core::DumpResult;
use revdump_wire::TextBody;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Buffered content of one node
pub struct ContentSpool {
    file: File,
    len: u64,
}

impl ContentSpool {
    /// Copy `content` into a new spool file in `dir`
    pub fn capture(dir: &Path, content: &mut dyn Read) -> DumpResult<Self> {
        let mut file = tempfile::tempfile_in(dir)?;
        let len = io::copy(content, &mut file)?;
        Ok(ContentSpool { file, len })
    }

    /// Number of buffered bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check if no bytes were buffered
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rewind and expose the content as a record body
    pub fn body(&mut self, delta: bool) -> DumpResult<TextBody<'_>> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(TextBody {
            reader: &mut self.file,
            len: self.len,
            delta,
        })
    }
}

impl std::fmt::Debug for ContentSpool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSpool").field("len", &self.len).finish()
    }
}
