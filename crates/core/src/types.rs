//! Core types for revision dumps
//!
//! This module defines the fundamental types used throughout the system:
//! - [`Revnum`]: a source repository revision number
//! - [`RevisionMetadata`]: the three revision properties carried by a dump
//! - [`NodeKind`] and [`NodeAction`]: the closed set of node record shapes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Revision number in the source repository
///
/// Revision 0 is the initial, empty state of every repository.
pub type Revnum = u64;

/// Metadata of one source revision
///
/// Immutable once fetched from the repository. Absent fields are skipped
/// entirely when the revision header is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMetadata {
    /// Source revision number
    pub revision: Revnum,
    /// Commit author
    pub author: Option<String>,
    /// Commit date, already in the dump's fixed date format
    pub date: Option<String>,
    /// Log message
    pub message: Option<String>,
}

impl RevisionMetadata {
    /// Create metadata for a revision with no properties
    pub fn new(revision: Revnum) -> Self {
        RevisionMetadata {
            revision,
            ..Default::default()
        }
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the date
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the log message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Revision properties in dump order: log, author, date
    ///
    /// Absent slots are reported as `None` so callers can skip them.
    pub fn properties(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("svn:log", self.message.as_deref()),
            ("svn:author", self.author.as_deref()),
            ("svn:date", self.date.as_deref()),
        ]
    }
}

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Regular file with text content
    #[serde(rename = "file")]
    File,
    /// Directory
    #[serde(rename = "dir")]
    Dir,
}

impl NodeKind {
    /// Name used on the `Node-kind` line
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Dir => "dir",
        }
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Dir)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action recorded for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeAction {
    /// Node is new in this revision
    Add,
    /// Node existed and was modified
    Change,
    /// Node was removed
    Delete,
    /// Node was removed and re-added in the same revision
    Replace,
}

impl NodeAction {
    /// Name used on the `Node-action` line
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeAction::Add => "add",
            NodeAction::Change => "change",
            NodeAction::Delete => "delete",
            NodeAction::Replace => "replace",
        }
    }

    /// Whether a node with this action must appear in the dump even
    /// without property or content changes of its own
    pub fn always_recorded(&self) -> bool {
        matches!(
            self,
            NodeAction::Add | NodeAction::Delete | NodeAction::Replace
        )
    }
}

impl fmt::Display for NodeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
