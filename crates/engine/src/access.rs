//! Repository access seams
//!
//! The dump engine never talks to a repository directly. It consumes two
//! capabilities:
//!
//! - [`RepositoryAccess`]: revision lookups, log retrieval and the tree
//!   diff primitive, implemented by a repository backend
//! - [`TreeEditSink`]: the callback protocol a backend drives while
//!   reporting one tree diff, implemented by the dump editor
//!
//! Nodes are addressed through [`NodeId`] handles handed out by the sink
//! for the duration of one diff pass.

use revdump_core::{DumpResult, NodeKind, RevisionMetadata, Revnum};
use std::fmt;
use std::io::Read;

/// Handle for a node that is open during one diff pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw handle value
    pub fn raw(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State a tree diff starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffBase {
    /// The empty tree: every node of the target is reported as added
    Empty,
    /// The tree as of a revision
    Revision(Revnum),
}

impl DiffBase {
    /// Base revision number, 0 for the empty tree
    pub fn revision(&self) -> Revnum {
        match self {
            DiffBase::Empty => 0,
            DiffBase::Revision(r) => *r,
        }
    }
}

/// One tree diff to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    /// State to diff from
    pub base: DiffBase,
    /// Revision to diff to
    pub target: Revnum,
    /// Restrict the diff to this entry of the session root (single-file exports)
    pub target_name: Option<String>,
    /// Stream content as svndiff deltas instead of full texts
    pub deltas: bool,
}

/// Callback protocol driven by a tree diff
///
/// Calls for one diff pass arrive strictly sequentially: a parent is opened
/// before its children and closed after them. Paths are relative to the
/// session root.
pub trait TreeEditSink {
    /// Open the session root
    fn open_root(&mut self, base: Revnum) -> DumpResult<NodeId>;

    /// A node was added below `parent`
    fn add_node(&mut self, parent: NodeId, path: &str, kind: NodeKind) -> DumpResult<NodeId>;

    /// A node was deleted and re-added below `parent` in the same revision
    fn replace_node(&mut self, parent: NodeId, path: &str, kind: NodeKind) -> DumpResult<NodeId>;

    /// An existing node below `parent` was modified
    fn open_node(&mut self, parent: NodeId, path: &str, kind: NodeKind) -> DumpResult<NodeId>;

    /// A node below `parent` was deleted
    fn delete_node(&mut self, parent: NodeId, path: &str) -> DumpResult<()>;

    /// A property of `node` changed; `None` deletes it
    fn change_property(&mut self, node: NodeId, key: &str, value: Option<&[u8]>) -> DumpResult<()>;

    /// New content for a file, already encoded for the dump
    fn apply_content(&mut self, node: NodeId, content: &mut dyn Read) -> DumpResult<()>;

    /// No more callbacks will reference `node`
    fn close_node(&mut self, node: NodeId) -> DumpResult<()>;

    /// The diff pass completed
    fn close_edit(&mut self) -> DumpResult<()>;

    /// The diff pass failed and will deliver no more callbacks
    fn abort(&mut self) -> DumpResult<()>;
}

/// Read access to a versioned tree
///
/// Every failure is fatal to the export; implementations do not retry.
pub trait RepositoryAccess {
    /// Session URL, used in messages
    fn url(&self) -> &str;

    /// Path of the exported tree below the repository root, empty for the root
    fn session_path(&self) -> &str;

    /// Latest revision that touched the session path
    fn latest_revision(&mut self) -> DumpResult<Revnum>;

    /// Kind of `path` (relative to the session) in `revision`, `None` if absent
    fn check_path(&mut self, path: &str, revision: Revnum) -> DumpResult<Option<NodeKind>>;

    /// Repository UUID, `None` if the backend has none
    fn uuid(&mut self) -> DumpResult<Option<String>>;

    /// Narrowest range holding the session path's history up to `end`
    fn history_range(&mut self, end: Revnum) -> DumpResult<(Revnum, Revnum)>;

    /// Metadata of every revision in `[start, end]` touching the session path
    fn fetch_log_range(&mut self, start: Revnum, end: Revnum) -> DumpResult<Vec<RevisionMetadata>>;

    /// Metadata of the first revision in `[revision, end]` touching the session path
    fn fetch_log(&mut self, revision: Revnum, end: Revnum) -> DumpResult<Option<RevisionMetadata>>;

    /// Re-target the session to `path`, given relative to the repository root
    fn reparent(&mut self, path: &str) -> DumpResult<()>;

    /// Run a tree diff, reporting it to `sink`
    ///
    /// Implementations call [`TreeEditSink::abort`] before returning an error
    /// once the edit has been opened.
    fn run_tree_diff(&mut self, request: &DiffRequest, sink: &mut dyn TreeEditSink) -> DumpResult<()>;
}
