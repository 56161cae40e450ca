//! Revision-range orchestration
//!
//! [`Dumper`] drives one export: it resolves the revision range once, writes
//! the stream header and then walks the source revisions, emitting a revision
//! record and running one tree diff per revision into a fresh
//! [`DumpEditor`].
//!
//! ## Numbering
//!
//! Two counters advance together. `global` is the source revision being
//! exported; `local` is the number written to the stream unless original
//! numbers are kept. `local` starts at 0 when the export starts at revision 0
//! and at 1 otherwise, and grows by one per emitted revision no matter how
//! many source revisions were skipped in between.
//!
//! ## Diff base
//!
//! Each revision is diffed against `global - 1`. When a sub-path is exported
//! and that base predates the start of the range, the start (the end for
//! single-file exports) is used instead, so the diff never starts from a
//! state where the sub-path did not exist. A base equal to the target
//! revision means a diff against the empty tree.

use crate::access::{DiffBase, DiffRequest, RepositoryAccess};
use crate::editor::DumpEditor;
use revdump_core::{DumpError, DumpOptions, DumpResult, RevSpec, RevisionMetadata, Revnum};
use revdump_wire::{DumpWriter, PathRules};
use std::collections::VecDeque;
use std::io::Write;
use tracing::{debug, info};

/// Outcome of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    /// Number of revision records written
    pub revisions_dumped: u64,
    /// First source revision exported
    pub first: Option<Revnum>,
    /// Last source revision exported
    pub last: Option<Revnum>,
    /// Bytes written to the stream
    pub bytes_written: u64,
}

/// Revision bounds after `HEAD` and auto-detection are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    /// First source revision
    pub start: Revnum,
    /// Last source revision
    pub end: Revnum,
}

/// What the session root turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportRoot {
    /// The whole repository
    Repository,
    /// A directory below the repository root
    SubTree,
    /// A single file; the session is re-targeted to its parent
    File {
        /// Base name, used as the path of every node record
        name: String,
    },
}

impl ExportRoot {
    fn is_sub_path(&self) -> bool {
        !matches!(self, ExportRoot::Repository)
    }

    fn file_name(&self) -> Option<&str> {
        match self {
            ExportRoot::File { name } => Some(name),
            _ => None,
        }
    }
}

/// Diff base for revision `global`
pub fn diff_base(global: Revnum, range: ResolvedRange, root: &ExportRoot) -> Revnum {
    let base = global.saturating_sub(1);
    if root.is_sub_path() && base < range.start {
        // Known limitation: a file exported over a range is diffed against the
        // end of the range.
        return match root {
            ExportRoot::File { .. } => range.end,
            _ => range.start,
        };
    }
    base
}

/// Counters threaded through the main loop
#[derive(Debug)]
struct LoopState {
    global: Revnum,
    local: Revnum,
    previous: Option<Revnum>,
    first: Option<Revnum>,
    dumped: u64,
}

impl LoopState {
    fn new(start: Revnum) -> Self {
        LoopState {
            global: start,
            local: if start == 0 { 0 } else { 1 },
            previous: None,
            first: None,
            dumped: 0,
        }
    }

    fn advance(&mut self, exported: Revnum) {
        self.first.get_or_insert(exported);
        self.previous = Some(exported);
        self.global = exported + 1;
        self.local += 1;
        self.dumped += 1;
    }
}

/// Exports a revision range of a repository into a dump stream
pub struct Dumper<'r, R: RepositoryAccess + ?Sized> {
    repo: &'r mut R,
    options: DumpOptions,
}

impl<'r, R: RepositoryAccess + ?Sized> Dumper<'r, R> {
    /// Create a dumper over a repository session
    pub fn new(repo: &'r mut R, options: DumpOptions) -> Self {
        Dumper { repo, options }
    }

    /// Resolve `HEAD` and auto-detected bounds, checking the path exists
    pub fn resolve_range(&mut self) -> DumpResult<ResolvedRange> {
        let range = self.options.range;
        let (start, end) = match range.end {
            RevSpec::Head => {
                let head = self.repo.latest_revision()?;
                match range.start {
                    None | Some(RevSpec::Number(0)) => self.repo.history_range(head)?,
                    Some(RevSpec::Head) => {
                        self.require_path(head)?;
                        (head, head)
                    }
                    Some(RevSpec::Number(start)) => {
                        self.require_path(start)?;
                        (start, head)
                    }
                }
            }
            RevSpec::Number(end) => match range.start {
                None => self.repo.history_range(end)?,
                Some(start) => {
                    let start = match start {
                        RevSpec::Number(n) => n,
                        RevSpec::Head => self.repo.latest_revision()?,
                    };
                    // Revision 0 holds no sub-path; run() raises the start to 1
                    if start != 0 || self.repo.session_path().is_empty() {
                        self.require_path(start)?;
                    }
                    self.require_path(end)?;
                    (start, end)
                }
            },
        };

        if start > end {
            return Err(DumpError::InvalidRevisionRange {
                spec: format!("{}:{}", start, end),
            });
        }
        debug!(start, end, "resolved revision range");
        Ok(ResolvedRange { start, end })
    }

    fn require_path(&mut self, revision: Revnum) -> DumpResult<()> {
        if self.repo.check_path("", revision)?.is_none() {
            return Err(DumpError::PathNotFound {
                url: self.repo.url().to_string(),
                revision,
            });
        }
        Ok(())
    }

    /// Classify the session root, re-targeting the session for single files
    fn resolve_root(&mut self, range: ResolvedRange) -> DumpResult<ExportRoot> {
        let session_path = self.repo.session_path().trim_matches('/').to_string();
        if session_path.is_empty() {
            return Ok(ExportRoot::Repository);
        }

        let kind = match self.repo.check_path("", range.start)? {
            Some(kind) => Some(kind),
            None => self.repo.check_path("", range.end)?,
        };
        if kind.map_or(false, |k| !k.is_dir()) {
            let (parent, name) = match session_path.rsplit_once('/') {
                Some((parent, name)) => (parent.to_string(), name.to_string()),
                None => (String::new(), session_path.clone()),
            };
            debug!(parent = %parent, file = %name, "exporting single file");
            self.repo.reparent(&parent)?;
            return Ok(ExportRoot::File { name });
        }

        self.repo.reparent(&session_path)?;
        Ok(ExportRoot::SubTree)
    }

    /// Run the export, writing the dump stream to `out`
    pub fn run<W: Write>(&mut self, out: W) -> DumpResult<DumpSummary> {
        let mut range = self.resolve_range()?;
        let root = self.resolve_root(range)?;

        let mut prefetched: Option<VecDeque<RevisionMetadata>> = None;
        if self.options.incremental && range.start != 0 {
            let logs = self.repo.fetch_log_range(range.start, range.end)?;
            let last = logs.last().map(|m| m.revision).ok_or_else(|| {
                DumpError::repository(format!(
                    "no revisions touch '{}' in {}:{}",
                    self.repo.url(),
                    range.start,
                    range.end
                ))
            })?;
            debug!(count = logs.len(), last, "prefetched revision metadata");
            range.end = last;
            prefetched = Some(logs.into());
        }

        if range.start == 0 && root.is_sub_path() {
            range.start = 1;
        }

        let paths = PathRules {
            user_prefix: self.options.user_prefix.clone(),
            single_file: root.file_name().map(str::to_string),
        };
        let mut writer = DumpWriter::with_paths(out, paths);
        let uuid = self.repo.uuid()?;
        writer.write_stream_header(self.options.format_version(), uuid.as_deref())?;

        let mut state = LoopState::new(range.start);
        while state.global <= range.end {
            let meta = match prefetched.as_mut() {
                Some(logs) => logs.pop_front(),
                None => self.repo.fetch_log(state.global, range.end)?,
            };
            let meta = match meta {
                Some(meta) => meta,
                None => break,
            };

            let number = if self.options.keep_revnums {
                meta.revision
            } else {
                state.local
            };
            writer.write_revision_header(&meta, number)?;

            let base = diff_base(state.global, range, &root);
            debug!(
                global = state.global,
                base,
                previous = ?state.previous,
                "diffing revision"
            );
            let request = DiffRequest {
                base: if base == meta.revision {
                    DiffBase::Empty
                } else {
                    DiffBase::Revision(base)
                },
                target: meta.revision,
                target_name: root.file_name().map(str::to_string),
                deltas: self.options.use_deltas,
            };

            let mut editor = DumpEditor::new(
                &mut writer,
                &self.options.scratch_dir,
                meta.revision,
                self.options.use_deltas,
            );
            self.repo.run_tree_diff(&request, &mut editor)?;
            editor.finish()?;

            info!(revision = meta.revision, local = number, "Dumped revision");
            state.advance(meta.revision);
        }

        writer.flush()?;
        Ok(DumpSummary {
            revisions_dumped: state.dumped,
            first: state.first,
            last: state.previous,
            bytes_written: writer.bytes_written(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: ResolvedRange = ResolvedRange { start: 5, end: 8 };

    #[test]
    fn test_base_is_previous_revision() {
        assert_eq!(diff_base(7, RANGE, &ExportRoot::Repository), 6);
        assert_eq!(diff_base(5, RANGE, &ExportRoot::Repository), 4);
        assert_eq!(diff_base(0, RANGE, &ExportRoot::Repository), 0);
    }

    #[test]
    fn test_sub_tree_base_clamped_to_start() {
        assert_eq!(diff_base(5, RANGE, &ExportRoot::SubTree), 5);
        assert_eq!(diff_base(6, RANGE, &ExportRoot::SubTree), 5);
        assert_eq!(diff_base(8, RANGE, &ExportRoot::SubTree), 7);
    }

    #[test]
    fn test_single_file_base_uses_end() {
        let root = ExportRoot::File { name: "a.txt".to_string() };
        assert_eq!(diff_base(5, RANGE, &root), 8);
        assert_eq!(diff_base(6, RANGE, &root), 5);
    }

    #[test]
    fn test_loop_state_numbering() {
        let mut state = LoopState::new(0);
        assert_eq!(state.local, 0);
        state.advance(0);
        state.advance(3);
        assert_eq!(state.global, 4);
        assert_eq!(state.local, 2);
        assert_eq!(state.first, Some(0));
        assert_eq!(state.previous, Some(3));

        let state = LoopState::new(5);
        assert_eq!(state.local, 1);
    }
}
