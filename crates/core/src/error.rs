//! Error types for revdump
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors fall into three groups:
//! - configuration errors, reported before anything is written
//! - collaborator errors, raised by the repository access layer and fatal to the run
//! - contract violations, which are defects and never recovered from

use crate::types::Revnum;
use std::io;
use thiserror::Error;

/// Result type alias for revdump operations
pub type DumpResult<T> = std::result::Result<T, DumpError>;

/// Error types for revdump
#[derive(Debug, Error)]
pub enum DumpError {
    /// Malformed revision or revision range argument
    #[error("invalid revision range '{spec}'")]
    InvalidRevisionRange {
        /// The offending argument
        spec: String,
    },

    /// No repository URL was given
    #[error("no repository URL given")]
    MissingUrl,

    /// URL scheme has no repository backend
    #[error("unsupported repository URL '{url}'")]
    UnsupportedUrl {
        /// The offending URL
        url: String,
    },

    /// Other configuration problem
    #[error("configuration error: {0}")]
    Config(String),

    /// Export path does not exist in a revision
    #[error("URL '{url}' not found in revision {revision}")]
    PathNotFound {
        /// Session URL
        url: String,
        /// Revision that was checked
        revision: Revnum,
    },

    /// Repository access failure (transport, authentication, lookup)
    #[error("repository error: {0}")]
    Repository(String),

    /// Tree diff failed while producing a revision
    #[error("diff failed for revision {revision}: {reason}")]
    DiffFailed {
        /// Target revision of the failed diff
        revision: Revnum,
        /// Collaborator-provided reason
        reason: String,
    },

    /// Tree edit was aborted by the collaborator
    #[error("tree edit aborted in revision {revision}")]
    Aborted {
        /// Revision being edited
        revision: Revnum,
    },

    /// Same property key set twice on one node
    #[error("duplicate property '{key}'")]
    DuplicateProperty {
        /// Property key
        key: String,
    },

    /// Node header written twice
    #[error("node '{path}' already emitted")]
    AlreadyEmitted {
        /// Node path
        path: String,
    },

    /// Declared and written byte counts disagree
    #[error("length mismatch: declared {declared} bytes, wrote {written}")]
    LengthMismatch {
        /// Length announced in the header
        declared: u64,
        /// Bytes actually written
        written: u64,
    },

    /// Callback referenced a node that is not open
    #[error("unknown node handle {0}")]
    UnknownNode(u32),

    /// Other editor protocol violation
    #[error("contract violation: {0}")]
    Contract(String),

    /// I/O error (output stream, scratch files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DumpError {
    /// Create a repository error
    pub fn repository(msg: impl Into<String>) -> Self {
        DumpError::Repository(msg.into())
    }

    /// Create a contract violation error
    pub fn contract(msg: impl Into<String>) -> Self {
        DumpError::Contract(msg.into())
    }

    /// Check if this error is a defect rather than a runtime condition
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            DumpError::DuplicateProperty { .. }
                | DumpError::AlreadyEmitted { .. }
                | DumpError::LengthMismatch { .. }
                | DumpError::UnknownNode(_)
                | DumpError::Contract(_)
        )
    }

    /// Check if this error stems from user-supplied configuration
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DumpError::InvalidRevisionRange { .. }
                | DumpError::MissingUrl
                | DumpError::UnsupportedUrl { .. }
                | DumpError::Config(_)
        )
    }
}

impl From<serde_json::Error> for DumpError {
    fn from(e: serde_json::Error) -> Self {
        DumpError::Serialization(e.to_string())
    }
}
