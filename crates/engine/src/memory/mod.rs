//! In-memory repository backend
//!
//! [`MemoryRepository`] implements [`RepositoryAccess`] over a history held
//! in memory: every revision stores its full tree, so lookups at any
//! revision are map lookups and tree diffs are computed by walking two
//! trees side by side.
//!
//! A repository is built by [`MemoryRepository::commit`]ting changes or by
//! loading a JSON [`HistoryDocument`]. Sessions start at the repository root;
//! [`MemoryRepository::at_path`] narrows one to a sub-path.

mod diff;
pub mod history;
pub mod svndiff;

pub use history::{Change, ChangeAction, CommitDocument, HistoryDocument};

use crate::access::{DiffRequest, RepositoryAccess, TreeEditSink};
use revdump_core::{DumpError, DumpResult, NodeKind, RevisionMetadata, Revnum};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// One versioned node
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) kind: NodeKind,
    pub(crate) props: BTreeMap<String, Vec<u8>>,
    pub(crate) content: Vec<u8>,
}

impl Entry {
    fn new(kind: NodeKind) -> Self {
        Entry {
            kind,
            props: BTreeMap::new(),
            content: Vec::new(),
        }
    }
}

/// Full tree of one revision, keyed by repository path; `""` is the root
pub(crate) type Tree = BTreeMap<String, Entry>;

/// One committed revision
#[derive(Debug, Clone)]
pub(crate) struct Revision {
    pub(crate) meta: RevisionMetadata,
    pub(crate) tree: Tree,
    pub(crate) changed: BTreeSet<String>,
    pub(crate) replaced: BTreeSet<String>,
}

/// Join two repository paths
pub(crate) fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        parent.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Check if `path` is `ancestor` or lies below it
pub(crate) fn is_within(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Repository held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    url: String,
    uuid: Option<String>,
    revisions: Vec<Revision>,
    session_path: String,
    root: String,
    fail_diff_at: Option<Revnum>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    /// Create a repository holding only the empty revision 0
    pub fn new() -> Self {
        let mut tree = Tree::new();
        tree.insert(String::new(), Entry::new(NodeKind::Dir));

        MemoryRepository {
            url: "memory://".to_string(),
            uuid: Some(uuid::Uuid::new_v4().to_string()),
            revisions: vec![Revision {
                meta: RevisionMetadata::new(0),
                tree,
                changed: BTreeSet::new(),
                replaced: BTreeSet::new(),
            }],
            session_path: String::new(),
            root: String::new(),
            fail_diff_at: None,
        }
    }

    /// Build a repository from a parsed history
    pub fn from_document(doc: HistoryDocument) -> DumpResult<Self> {
        let mut repo = Self::new();
        if doc.uuid.is_some() {
            repo.uuid = doc.uuid;
        }
        for commit in doc.revisions {
            let date = commit
                .date
                .as_deref()
                .map(history::normalize_date)
                .transpose()?;
            repo.commit_with(commit.author, date, commit.log, commit.changes)?;
        }
        Ok(repo)
    }

    /// Parse a JSON history
    pub fn from_json(json: &str) -> DumpResult<Self> {
        Self::from_document(HistoryDocument::from_json(json)?)
    }

    /// Load a JSON history file
    pub fn load(path: &Path) -> DumpResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let repo = Self::from_json(&json)?;
        debug!(path = %path.display(), youngest = repo.youngest(), "loaded history");
        Ok(repo.with_url(format!("file://{}", path.display())))
    }

    /// Set the URL of the repository root
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set or clear the repository UUID
    pub fn with_uuid(mut self, uuid: Option<String>) -> Self {
        self.uuid = uuid;
        self
    }

    /// Point the session at `path` below the repository root
    pub fn at_path(mut self, path: &str) -> Self {
        self.session_path = path.trim_matches('/').to_string();
        self.root = self.session_path.clone();
        self
    }

    /// Make the diff for `revision` fail after reporting its changes
    pub fn fail_diff_at(mut self, revision: Revnum) -> Self {
        self.fail_diff_at = Some(revision);
        self
    }

    /// Newest revision number
    pub fn youngest(&self) -> Revnum {
        (self.revisions.len() - 1) as Revnum
    }

    /// Path the diff primitive currently works on
    pub fn root_path(&self) -> &str {
        &self.root
    }

    /// Commit a revision without metadata
    pub fn commit(&mut self, changes: Vec<Change>) -> DumpResult<Revnum> {
        self.commit_with(None, None, None, changes)
    }

    /// Commit a revision
    ///
    /// `date` is stored as given; use [`history::normalize_date`] for
    /// free-form input.
    pub fn commit_with(
        &mut self,
        author: Option<String>,
        date: Option<String>,
        log: Option<String>,
        changes: Vec<Change>,
    ) -> DumpResult<Revnum> {
        let number = self.youngest() + 1;
        let mut tree = self.revisions[self.revisions.len() - 1].tree.clone();
        let mut changed = BTreeSet::new();
        let mut replaced = BTreeSet::new();

        for change in changes {
            apply_change(&mut tree, &change, number)?;
            if change.action == ChangeAction::Replace {
                replaced.insert(change.path.clone());
            }
            changed.insert(change.path);
        }

        self.revisions.push(Revision {
            meta: RevisionMetadata {
                revision: number,
                author,
                date,
                message: log,
            },
            tree,
            changed,
            replaced,
        });
        Ok(number)
    }

    pub(crate) fn revision(&self, revision: Revnum) -> DumpResult<&Revision> {
        self.revisions
            .get(revision as usize)
            .ok_or_else(|| DumpError::repository(format!("no such revision {}", revision)))
    }

    /// Whether `revision` changed the session path, something below it or
    /// one of its ancestors
    ///
    /// Every revision touches the repository root, revision 0 included.
    fn touches(&self, revision: &Revision) -> bool {
        let path = &self.session_path;
        path.is_empty()
            || revision
                .changed
                .iter()
                .any(|c| is_within(c, path) || (!c.is_empty() && is_within(path, c)))
    }

    fn touching(&self, start: Revnum, end: Revnum) -> impl Iterator<Item = &Revision> + '_ {
        let end = end.min(self.youngest());
        self.revisions
            .iter()
            .skip(start as usize)
            .take_while(move |r| r.meta.revision <= end)
            .filter(move |r| self.touches(r))
    }
}

fn apply_change(tree: &mut Tree, change: &Change, revision: Revnum) -> DumpResult<()> {
    let path = change.path.as_str();
    let invalid = |what: &str| {
        DumpError::repository(format!(
            "cannot apply {:?} of '{}' in revision {}: {}",
            change.action, path, revision, what
        ))
    };
    if path.is_empty() && change.action != ChangeAction::Modify {
        return Err(invalid("the root can only be modified"));
    }

    match change.action {
        ChangeAction::Add | ChangeAction::Replace => {
            match (change.action, tree.contains_key(path)) {
                (ChangeAction::Add, true) => return Err(invalid("path exists")),
                (ChangeAction::Replace, false) => return Err(invalid("path does not exist")),
                _ => {}
            }
            if tree.get(parent_of(path)).map(|e| e.kind) != Some(NodeKind::Dir) {
                return Err(invalid("parent is not a directory"));
            }
            remove_subtree(tree, path);
            let mut entry = Entry::new(change.node_kind());
            if entry.kind == NodeKind::File {
                entry.content = change.content.clone().unwrap_or_default().into_bytes();
            } else if change.content.is_some() {
                return Err(invalid("directories have no content"));
            }
            apply_props(&mut entry, change);
            tree.insert(path.to_string(), entry);
        }
        ChangeAction::Modify => {
            let entry = tree.get_mut(path).ok_or_else(|| invalid("path does not exist"))?;
            if let Some(content) = &change.content {
                if entry.kind != NodeKind::File {
                    return Err(invalid("directories have no content"));
                }
                entry.content = content.clone().into_bytes();
            }
            apply_props(entry, change);
        }
        ChangeAction::Delete => {
            if !tree.contains_key(path) {
                return Err(invalid("path does not exist"));
            }
            remove_subtree(tree, path);
        }
    }
    Ok(())
}

fn apply_props(entry: &mut Entry, change: &Change) {
    for (key, value) in &change.props {
        match value {
            Some(v) => entry.props.insert(key.clone(), v.clone().into_bytes()),
            None => entry.props.remove(key),
        };
    }
}

fn remove_subtree(tree: &mut Tree, path: &str) {
    tree.retain(|p, _| !is_within(p, path));
}

impl RepositoryAccess for MemoryRepository {
    fn url(&self) -> &str {
        &self.url
    }

    fn session_path(&self) -> &str {
        &self.session_path
    }

    fn latest_revision(&mut self) -> DumpResult<Revnum> {
        let youngest = self.youngest();
        Ok(self
            .touching(0, youngest)
            .last()
            .map_or(0, |r| r.meta.revision))
    }

    fn check_path(&mut self, path: &str, revision: Revnum) -> DumpResult<Option<NodeKind>> {
        let full = join(&self.root, path.trim_matches('/'));
        Ok(self.revision(revision)?.tree.get(&full).map(|e| e.kind))
    }

    fn uuid(&mut self) -> DumpResult<Option<String>> {
        Ok(self.uuid.clone())
    }

    fn history_range(&mut self, end: Revnum) -> DumpResult<(Revnum, Revnum)> {
        self.revision(end)?;
        let first = self
            .touching(0, end)
            .find(|r| r.tree.contains_key(&self.session_path))
            .map(|r| r.meta.revision)
            .ok_or_else(|| DumpError::PathNotFound {
                url: self.url.clone(),
                revision: end,
            })?;
        Ok((first, end))
    }

    fn fetch_log_range(&mut self, start: Revnum, end: Revnum) -> DumpResult<Vec<RevisionMetadata>> {
        Ok(self.touching(start, end).map(|r| r.meta.clone()).collect())
    }

    fn fetch_log(&mut self, revision: Revnum, end: Revnum) -> DumpResult<Option<RevisionMetadata>> {
        Ok(self.touching(revision, end).next().map(|r| r.meta.clone()))
    }

    fn reparent(&mut self, path: &str) -> DumpResult<()> {
        let path = path.trim_matches('/');
        if !self.revisions.iter().any(|r| r.tree.contains_key(path)) {
            return Err(DumpError::repository(format!(
                "cannot reparent to '{}': path never existed",
                path
            )));
        }
        debug!(from = %self.root, to = %path, "reparent session");
        self.root = path.to_string();
        Ok(())
    }

    fn run_tree_diff(&mut self, request: &DiffRequest, sink: &mut dyn TreeEditSink) -> DumpResult<()> {
        diff::run(self, request, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryRepository {
        let mut repo = MemoryRepository::new();
        repo.commit(vec![Change::add_dir("trunk"), Change::add_dir("branches")])
            .unwrap();
        repo.commit(vec![Change::add_file("trunk/a.txt", "one")]).unwrap();
        repo.commit(vec![Change::add_dir("branches/b")]).unwrap();
        repo.commit(vec![Change::modify("trunk/a.txt", "two")]).unwrap();
        repo
    }

    #[test]
    fn test_commit_builds_trees() {
        let mut repo = sample();
        assert_eq!(repo.youngest(), 4);
        assert_eq!(repo.check_path("trunk/a.txt", 1).unwrap(), None);
        assert_eq!(repo.check_path("trunk/a.txt", 2).unwrap(), Some(NodeKind::File));
        assert_eq!(repo.check_path("trunk", 0).unwrap(), None);
        assert_eq!(repo.check_path("", 0).unwrap(), Some(NodeKind::Dir));
        assert!(repo.check_path("", 9).is_err());
    }

    #[test]
    fn test_invalid_changes_rejected() {
        let mut repo = sample();
        assert!(repo.commit(vec![Change::add_dir("trunk")]).is_err());
        assert!(repo.commit(vec![Change::delete("nope")]).is_err());
        assert!(repo.commit(vec![Change::add_file("missing/x", "")]).is_err());
        assert!(repo.commit(vec![Change::modify("trunk", "text")]).is_err());
        assert_eq!(repo.youngest(), 4);
    }

    #[test]
    fn test_delete_removes_subtree() {
        let mut repo = sample();
        repo.commit(vec![Change::delete("trunk")]).unwrap();
        assert_eq!(repo.check_path("trunk/a.txt", 5).unwrap(), None);
        assert_eq!(repo.check_path("trunk/a.txt", 4).unwrap(), Some(NodeKind::File));
    }

    #[test]
    fn test_history_queries_follow_session_path() {
        let mut repo = sample().at_path("trunk");
        assert_eq!(repo.latest_revision().unwrap(), 4);
        assert_eq!(repo.history_range(4).unwrap(), (1, 4));

        let revs: Vec<Revnum> = repo
            .fetch_log_range(1, 4)
            .unwrap()
            .iter()
            .map(|m| m.revision)
            .collect();
        assert_eq!(revs, vec![1, 2, 4]);

        assert_eq!(repo.fetch_log(3, 4).unwrap().map(|m| m.revision), Some(4));
        assert_eq!(repo.fetch_log(3, 3).unwrap(), None);
    }

    #[test]
    fn test_root_session_touched_by_every_revision() {
        let mut repo = sample();
        assert_eq!(repo.latest_revision().unwrap(), 4);
        assert_eq!(repo.history_range(4).unwrap(), (0, 4));
        assert_eq!(repo.fetch_log_range(0, 4).unwrap().len(), 5);
    }

    #[test]
    fn test_history_range_for_missing_path() {
        let mut repo = sample().at_path("tags");
        assert!(matches!(
            repo.history_range(4),
            Err(DumpError::PathNotFound { revision: 4, .. })
        ));
    }

    #[test]
    fn test_reparent_changes_lookup_root() {
        let mut repo = sample().at_path("trunk/a.txt");
        assert_eq!(repo.check_path("", 2).unwrap(), Some(NodeKind::File));
        repo.reparent("trunk").unwrap();
        assert_eq!(repo.check_path("a.txt", 2).unwrap(), Some(NodeKind::File));
        assert_eq!(repo.session_path(), "trunk/a.txt");
        assert!(repo.reparent("nowhere").is_err());
    }

    #[test]
    fn test_load_from_json_normalizes_dates() {
        let mut repo = MemoryRepository::from_json(
            r#"{
                "uuid": "0d9a6d5e-1111-4222-8333-444455556666",
                "revisions": [
                    { "author": "bob", "date": "2011-03-04T10:20:30Z", "log": "init",
                      "changes": [ { "action": "add", "path": "a", "content": "x" } ] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            repo.uuid().unwrap().as_deref(),
            Some("0d9a6d5e-1111-4222-8333-444455556666")
        );
        let meta = repo.fetch_log(1, 1).unwrap().unwrap();
        assert_eq!(meta.author.as_deref(), Some("bob"));
        assert_eq!(meta.date.as_deref(), Some("2011-03-04T10:20:30.000000Z"));
        assert_eq!(meta.message.as_deref(), Some("init"));
    }

    #[test]
    fn test_generated_uuid() {
        let mut repo = MemoryRepository::new();
        let uuid = repo.uuid().unwrap().unwrap();
        assert!(uuid::Uuid::parse_str(&uuid).is_ok());
        assert_eq!(repo.with_uuid(None).uuid().unwrap(), None);
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a", "b"), "a/b");
        assert!(is_within("trunk/a", "trunk"));
        assert!(is_within("trunk", ""));
        assert!(!is_within("trunk2", "trunk"));
        assert_eq!(parent_of("a/b/c"), "a/b");
        assert_eq!(parent_of("a"), "");
    }
}
