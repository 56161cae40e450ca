//! Committed history of an in-memory repository
//!
//! A history is a list of commits, each a list of [`Change`]s applied to the
//! tree of the previous revision. Histories can be described in JSON:
//!
//! ```json
//! {
//!   "uuid": "2d1e3f5a-0000-4000-8000-000000000000",
//!   "revisions": [
//!     {
//!       "author": "alice",
//!       "date": "2011-03-04T10:20:30Z",
//!       "log": "import",
//!       "changes": [
//!         { "action": "add", "path": "trunk", "kind": "dir" },
//!         { "action": "add", "path": "trunk/a.txt", "content": "hello\n" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use revdump_core::{DumpError, DumpResult, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed format of `svn:date` values
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Kind of change applied to one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Create a node
    Add,
    /// Update content and/or properties of an existing node
    Modify,
    /// Remove a node and everything below it
    Delete,
    /// Remove a node and create a new one at the same path
    Replace,
}

/// One change of a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What happens to the path
    pub action: ChangeAction,
    /// Repository-relative path, without leading slash
    pub path: String,
    /// Kind of a created node, files by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    /// New file content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Property updates; `null` deletes a property
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, Option<String>>,
}

impl Change {
    fn new(action: ChangeAction, path: &str) -> Self {
        Change {
            action,
            path: path.trim_matches('/').to_string(),
            kind: None,
            content: None,
            props: BTreeMap::new(),
        }
    }

    /// Create a directory
    pub fn add_dir(path: &str) -> Self {
        Change {
            kind: Some(NodeKind::Dir),
            ..Self::new(ChangeAction::Add, path)
        }
    }

    /// Create a file
    pub fn add_file(path: &str, content: &str) -> Self {
        Change {
            kind: Some(NodeKind::File),
            content: Some(content.to_string()),
            ..Self::new(ChangeAction::Add, path)
        }
    }

    /// Replace a file's content
    pub fn modify(path: &str, content: &str) -> Self {
        Change {
            content: Some(content.to_string()),
            ..Self::new(ChangeAction::Modify, path)
        }
    }

    /// Touch properties only
    pub fn props(path: &str) -> Self {
        Self::new(ChangeAction::Modify, path)
    }

    /// Remove a node
    pub fn delete(path: &str) -> Self {
        Self::new(ChangeAction::Delete, path)
    }

    /// Replace a node with a new one of `kind`
    pub fn replace(path: &str, kind: NodeKind) -> Self {
        Change {
            kind: Some(kind),
            content: if kind.is_dir() { None } else { Some(String::new()) },
            ..Self::new(ChangeAction::Replace, path)
        }
    }

    /// Set a property
    pub fn with_prop(mut self, key: &str, value: &str) -> Self {
        self.props.insert(key.to_string(), Some(value.to_string()));
        self
    }

    /// Delete a property
    pub fn without_prop(mut self, key: &str) -> Self {
        self.props.insert(key.to_string(), None);
        self
    }

    /// Set the content of an added or replacing file
    pub fn with_content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub(crate) fn node_kind(&self) -> NodeKind {
        self.kind.unwrap_or(NodeKind::File)
    }
}

/// One commit of a history document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDocument {
    /// Commit author
    #[serde(default)]
    pub author: Option<String>,
    /// Commit date, RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC)
    #[serde(default)]
    pub date: Option<String>,
    /// Log message
    #[serde(default)]
    pub log: Option<String>,
    /// Changes in application order
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// A whole history, revision 1 first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDocument {
    /// Repository UUID; a random one is generated when absent
    #[serde(default)]
    pub uuid: Option<String>,
    /// Commits in order
    #[serde(default)]
    pub revisions: Vec<CommitDocument>,
}

impl HistoryDocument {
    /// Parse a JSON history
    pub fn from_json(json: &str) -> DumpResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Normalize a commit date to [`DATE_FORMAT`]
pub fn normalize_date(date: &str) -> DumpResult<String> {
    let utc: DateTime<Utc> = match DateTime::parse_from_rfc3339(date) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S")
            .map(|naive| naive.and_utc())
            .map_err(|e| DumpError::Serialization(format!("invalid date '{}': {}", date, e)))?,
    };
    Ok(utc.format(DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rfc3339() {
        assert_eq!(
            normalize_date("2011-03-04T10:20:30Z").unwrap(),
            "2011-03-04T10:20:30.000000Z"
        );
        assert_eq!(
            normalize_date("2011-03-04T12:20:30.5+02:00").unwrap(),
            "2011-03-04T10:20:30.500000Z"
        );
    }

    #[test]
    fn test_normalize_plain_timestamp() {
        assert_eq!(
            normalize_date("2011-03-04 10:20:30").unwrap(),
            "2011-03-04T10:20:30.000000Z"
        );
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(
            normalize_date("yesterday"),
            Err(DumpError::Serialization(_))
        ));
    }

    #[test]
    fn test_parse_document() {
        let doc = HistoryDocument::from_json(
            r#"{
                "revisions": [
                    {
                        "author": "alice",
                        "changes": [
                            { "action": "add", "path": "trunk", "kind": "dir" },
                            { "action": "add", "path": "trunk/a.txt", "content": "x",
                              "props": { "svn:eol-style": "native", "gone": null } }
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        assert!(doc.uuid.is_none());
        let commit = &doc.revisions[0];
        assert_eq!(commit.author.as_deref(), Some("alice"));
        assert_eq!(commit.changes[0], Change::add_dir("trunk"));
        assert_eq!(commit.changes[1].node_kind(), NodeKind::File);
        assert_eq!(commit.changes[1].props.get("gone"), Some(&None));
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let err = HistoryDocument::from_json(
            r#"{ "revisions": [ { "changes": [ { "action": "move", "path": "a" } ] } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, DumpError::Serialization(_)));
    }
}
