//! Tree-edit state machine
//!
//! [`DumpEditor`] turns the callbacks of one tree diff into node records.
//! Each open node lives in an arena slot addressed by its [`NodeId`] and
//! moves through `Pending -> Flushed -> Closed`; deletions are written
//! straight away and keep no state.
//!
//! ## Lazy flush
//!
//! A parent's record must precede its children's, but a directory that is
//! only a transparent ancestor of a change must not produce a record of its
//! own. A header is therefore written only when an event proves the node has
//! to appear:
//!
//! - before a child event, if the parent was added/replaced or carries
//!   property changes
//! - on close, for files, and for directories that were added/replaced or
//!   carry property changes
//!
//! File records are always written at close, when the property set and the
//! content length are both known. A directory's properties must all arrive
//! before its first child event.

use crate::access::{NodeId, TreeEditSink};
use crate::spool::ContentSpool;
use revdump_core::{DumpError, DumpResult, NodeAction, NodeKind, PropertySet, Revnum};
use revdump_wire::{DumpWriter, NodeBody, NodeHeader};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lifecycle of an open node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    /// Header not written yet
    Pending,
    /// Header written; for the root, implied by the revision header
    Flushed,
}

/// Per-node state of one diff pass
#[derive(Debug)]
struct NodeRecord {
    path: String,
    kind: NodeKind,
    action: NodeAction,
    props: PropertySet,
    text: Option<ContentSpool>,
    state: NodeState,
    is_root: bool,
}

impl NodeRecord {
    fn new(path: &str, kind: NodeKind, action: NodeAction) -> Self {
        NodeRecord {
            path: path.to_string(),
            kind,
            action,
            props: PropertySet::new(),
            text: None,
            state: NodeState::Pending,
            is_root: false,
        }
    }

    /// Whether the node must appear in the dump at all
    fn needs_record(&self) -> bool {
        match self.kind {
            NodeKind::File => true,
            NodeKind::Dir => self.action.always_recorded() || !self.props.is_empty(),
        }
    }
}

/// Sink that serializes one revision's tree diff
pub struct DumpEditor<'w, W: Write> {
    writer: &'w mut DumpWriter<W>,
    scratch_dir: PathBuf,
    revision: Revnum,
    deltas: bool,
    nodes: Vec<Option<NodeRecord>>,
    records: u64,
    aborted: bool,
    closed: bool,
}

impl<'w, W: Write> DumpEditor<'w, W> {
    /// Create an editor for the diff producing `revision`
    pub fn new(writer: &'w mut DumpWriter<W>, scratch_dir: &Path, revision: Revnum, deltas: bool) -> Self {
        DumpEditor {
            writer,
            scratch_dir: scratch_dir.to_path_buf(),
            revision,
            deltas,
            nodes: Vec::new(),
            records: 0,
            aborted: false,
            closed: false,
        }
    }

    /// Number of node records written so far
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Check if the collaborator aborted the edit
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Verify the pass ended cleanly
    ///
    /// Fails if the edit was aborted or never closed.
    pub fn finish(&self) -> DumpResult<()> {
        if self.aborted {
            return Err(DumpError::Aborted {
                revision: self.revision,
            });
        }
        if !self.closed {
            return Err(DumpError::contract(format!(
                "edit for revision {} was never closed",
                self.revision
            )));
        }
        Ok(())
    }

    fn alloc(&mut self, record: NodeRecord) -> NodeId {
        self.nodes.push(Some(record));
        NodeId((self.nodes.len() - 1) as u32)
    }

    fn node_mut(&mut self, id: NodeId) -> DumpResult<&mut NodeRecord> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(DumpError::UnknownNode(id.raw()))
    }

    fn ensure_active(&self) -> DumpResult<()> {
        if self.aborted || self.closed {
            return Err(DumpError::contract(format!(
                "callback after the edit for revision {} ended",
                self.revision
            )));
        }
        Ok(())
    }

    /// Write a pending node's record
    fn flush(&mut self, id: NodeId) -> DumpResult<()> {
        let deltas = self.deltas;
        let record = self
            .nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(DumpError::UnknownNode(id.raw()))?;
        if record.state == NodeState::Flushed {
            return Err(DumpError::AlreadyEmitted {
                path: record.path.clone(),
            });
        }

        debug!(path = %record.path, action = %record.action, "flushing node");
        let header = NodeHeader {
            path: &record.path,
            kind: record.kind,
            action: record.action,
        };
        let text = match record.text.as_mut() {
            Some(spool) => Some(spool.body(deltas)?),
            None => None,
        };
        self.writer.write_node(
            &header,
            NodeBody {
                props: Some(&record.props),
                text,
            },
        )?;

        record.state = NodeState::Flushed;
        record.text = None;
        self.records += 1;
        Ok(())
    }

    /// Lazy-flush rule applied before any child event
    fn flush_parent(&mut self, parent: NodeId) -> DumpResult<()> {
        let record = self.node_mut(parent)?;
        if record.kind != NodeKind::Dir {
            return Err(DumpError::contract(format!(
                "child event below file '{}'",
                record.path
            )));
        }
        if record.state == NodeState::Pending && record.needs_record() {
            self.flush(parent)?;
        }
        Ok(())
    }

    fn child(&mut self, parent: NodeId, path: &str, kind: NodeKind, action: NodeAction) -> DumpResult<NodeId> {
        self.ensure_active()?;
        self.flush_parent(parent)?;
        Ok(self.alloc(NodeRecord::new(path, kind, action)))
    }
}

impl<'w, W: Write> TreeEditSink for DumpEditor<'w, W> {
    fn open_root(&mut self, base: Revnum) -> DumpResult<NodeId> {
        self.ensure_active()?;
        debug!(base, target = self.revision, "open root");
        let mut root = NodeRecord::new("", NodeKind::Dir, NodeAction::Change);
        root.state = NodeState::Flushed;
        root.is_root = true;
        Ok(self.alloc(root))
    }

    fn add_node(&mut self, parent: NodeId, path: &str, kind: NodeKind) -> DumpResult<NodeId> {
        self.child(parent, path, kind, NodeAction::Add)
    }

    fn replace_node(&mut self, parent: NodeId, path: &str, kind: NodeKind) -> DumpResult<NodeId> {
        self.child(parent, path, kind, NodeAction::Replace)
    }

    fn open_node(&mut self, parent: NodeId, path: &str, kind: NodeKind) -> DumpResult<NodeId> {
        self.child(parent, path, kind, NodeAction::Change)
    }

    fn delete_node(&mut self, parent: NodeId, path: &str) -> DumpResult<()> {
        self.ensure_active()?;
        self.flush_parent(parent)?;
        let header = NodeHeader {
            path,
            kind: NodeKind::File,
            action: NodeAction::Delete,
        };
        self.writer.write_node(&header, NodeBody::empty())?;
        self.records += 1;
        Ok(())
    }

    fn change_property(&mut self, node: NodeId, key: &str, value: Option<&[u8]>) -> DumpResult<()> {
        self.ensure_active()?;
        let record = self.node_mut(node)?;
        if record.is_root {
            debug!(key, "ignoring property change on export root");
            return Ok(());
        }
        if record.state == NodeState::Flushed {
            return Err(DumpError::contract(format!(
                "property '{}' changed after '{}' was written",
                key, record.path
            )));
        }
        record.props.insert(key, value.map(<[u8]>::to_vec))
    }

    fn apply_content(&mut self, node: NodeId, content: &mut dyn Read) -> DumpResult<()> {
        self.ensure_active()?;
        let scratch_dir = self.scratch_dir.clone();
        let record = self.node_mut(node)?;
        if record.kind != NodeKind::File {
            return Err(DumpError::contract(format!(
                "content applied to directory '{}'",
                record.path
            )));
        }
        if record.state == NodeState::Flushed || record.text.is_some() {
            return Err(DumpError::contract(format!(
                "content applied twice to '{}'",
                record.path
            )));
        }
        let spool = ContentSpool::capture(&scratch_dir, content)?;
        debug!(path = %record.path, bytes = spool.len(), "captured content");
        record.text = Some(spool);
        Ok(())
    }

    fn close_node(&mut self, node: NodeId) -> DumpResult<()> {
        self.ensure_active()?;
        let record = self.node_mut(node)?;
        if record.state == NodeState::Pending && record.needs_record() {
            self.flush(node)?;
        }
        // Releases the node's spool, if any
        self.nodes[node.index()] = None;
        Ok(())
    }

    fn close_edit(&mut self) -> DumpResult<()> {
        self.ensure_active()?;
        let open = self.nodes.iter().filter(|n| n.is_some()).count();
        if open > 0 {
            return Err(DumpError::contract(format!(
                "{} nodes still open at end of edit",
                open
            )));
        }
        self.closed = true;
        Ok(())
    }

    fn abort(&mut self) -> DumpResult<()> {
        debug!(revision = self.revision, "edit aborted");
        self.aborted = true;
        self.nodes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&mut DumpEditor<'_, Vec<u8>>) -> DumpResult<()>,
    {
        let dir = TempDir::new().unwrap();
        let mut writer = DumpWriter::new(Vec::new());
        {
            let mut editor = DumpEditor::new(&mut writer, dir.path(), 1, false);
            f(&mut editor).unwrap();
        }
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_root_never_emits() {
        let out = run(|e| {
            let root = e.open_root(0)?;
            e.change_property(root, "svn:ignore", Some(b"*.o"))?;
            e.close_node(root)?;
            e.close_edit()
        });
        assert!(out.is_empty());
    }

    #[test]
    fn test_transparent_directory_produces_no_record() {
        let out = run(|e| {
            let root = e.open_root(0)?;
            let dir = e.open_node(root, "trunk", NodeKind::Dir)?;
            let file = e.add_node(dir, "trunk/new.txt", NodeKind::File)?;
            e.close_node(file)?;
            e.delete_node(dir, "trunk/old.txt")?;
            e.close_node(dir)?;
            e.close_node(root)?;
            e.close_edit()
        });
        assert!(!out.contains("Node-path: trunk\n"));
        assert!(out.contains("Node-path: trunk/new.txt\n"));
        assert!(out.contains("Node-path: trunk/old.txt\nNode-action: delete\n"));
    }

    #[test]
    fn test_added_directory_precedes_children() {
        let out = run(|e| {
            let root = e.open_root(0)?;
            let dir = e.add_node(root, "trunk", NodeKind::Dir)?;
            let file = e.add_node(dir, "trunk/a.txt", NodeKind::File)?;
            e.close_node(file)?;
            e.close_node(dir)?;
            e.close_node(root)?;
            e.close_edit()
        });
        let dir_pos = out.find("Node-path: trunk\nNode-kind: dir\nNode-action: add\n").unwrap();
        let file_pos = out.find("Node-path: trunk/a.txt\n").unwrap();
        assert!(dir_pos < file_pos);
        assert_eq!(out.matches("Node-path: trunk\n").count(), 1);
    }

    #[test]
    fn test_empty_added_directory_flushed_on_close() {
        let out = run(|e| {
            let root = e.open_root(0)?;
            let dir = e.add_node(root, "tags", NodeKind::Dir)?;
            e.close_node(dir)?;
            e.close_node(root)?;
            e.close_edit()
        });
        assert_eq!(out, "Node-path: tags\nNode-kind: dir\nNode-action: add\n\n\n");
    }

    #[test]
    fn test_directory_property_change_flushed_once_with_all_props() {
        let out = run(|e| {
            let root = e.open_root(0)?;
            let dir = e.open_node(root, "trunk", NodeKind::Dir)?;
            e.change_property(dir, "svn:ignore", Some(b"*.o"))?;
            e.change_property(dir, "svn:externals", None)?;
            let file = e.open_node(dir, "trunk/a.txt", NodeKind::File)?;
            e.close_node(file)?;
            e.close_node(dir)?;
            e.close_node(root)?;
            e.close_edit()
        });
        let block = "K 10\nsvn:ignore\nV 3\n*.o\nD 13\nsvn:externals\nPROPS-END\n";
        assert_eq!(out.matches("Node-path: trunk\n").count(), 1);
        assert!(out.contains(&format!(
            "Node-path: trunk\nNode-kind: dir\nNode-action: change\nProp-delta: true\n\
             Prop-content-length: {len}\nContent-length: {len}\n\n{block}\n\n",
            len = block.len(),
            block = block
        )));
    }

    #[test]
    fn test_directory_props_without_children_flushed_on_close() {
        let out = run(|e| {
            let root = e.open_root(0)?;
            let dir = e.open_node(root, "trunk", NodeKind::Dir)?;
            e.change_property(dir, "svn:ignore", Some(b"x"))?;
            e.close_node(dir)?;
            e.close_node(root)?;
            e.close_edit()
        });
        assert!(out.starts_with("Node-path: trunk\nNode-kind: dir\nNode-action: change\n"));
    }

    #[test]
    fn test_file_with_content_and_props() {
        let out = run(|e| {
            let root = e.open_root(0)?;
            let file = e.add_node(root, "a.txt", NodeKind::File)?;
            e.change_property(file, "svn:eol-style", Some(b"native"))?;
            e.apply_content(file, &mut Cursor::new(b"hello\n".to_vec()))?;
            e.close_node(file)?;
            e.close_node(root)?;
            e.close_edit()
        });
        assert!(out.contains("Text-content-length: 6\n"));
        assert!(out.ends_with("PROPS-END\nhello\n\n\n"));
    }

    #[test]
    fn test_file_without_changes_still_recorded() {
        let out = run(|e| {
            let root = e.open_root(0)?;
            let file = e.open_node(root, "a.txt", NodeKind::File)?;
            e.close_node(file)?;
            e.close_node(root)?;
            e.close_edit()
        });
        assert_eq!(out, "Node-path: a.txt\nNode-kind: file\nNode-action: change\n\n\n");
    }

    #[test]
    fn test_replace_action() {
        let out = run(|e| {
            let root = e.open_root(0)?;
            let dir = e.replace_node(root, "lib", NodeKind::Dir)?;
            e.close_node(dir)?;
            e.close_node(root)?;
            e.close_edit()
        });
        assert!(out.contains("Node-action: replace\n"));
    }

    #[test]
    fn test_property_after_flush_is_contract_violation() {
        let dir = TempDir::new().unwrap();
        let mut writer = DumpWriter::new(Vec::new());
        let mut e = DumpEditor::new(&mut writer, dir.path(), 1, false);

        let root = e.open_root(0).unwrap();
        let d = e.add_node(root, "d", NodeKind::Dir).unwrap();
        let f = e.add_node(d, "d/f", NodeKind::File).unwrap();
        e.close_node(f).unwrap();
        let err = e.change_property(d, "late", Some(b"1")).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let dir = TempDir::new().unwrap();
        let mut writer = DumpWriter::new(Vec::new());
        let mut e = DumpEditor::new(&mut writer, dir.path(), 1, false);

        let root = e.open_root(0).unwrap();
        let f = e.add_node(root, "f", NodeKind::File).unwrap();
        e.change_property(f, "k", Some(b"1")).unwrap();
        let err = e.change_property(f, "k", None).unwrap_err();
        assert!(matches!(err, DumpError::DuplicateProperty { .. }));
    }

    #[test]
    fn test_unknown_and_closed_handles() {
        let dir = TempDir::new().unwrap();
        let mut writer = DumpWriter::new(Vec::new());
        let mut e = DumpEditor::new(&mut writer, dir.path(), 1, false);

        let root = e.open_root(0).unwrap();
        let f = e.add_node(root, "f", NodeKind::File).unwrap();
        e.close_node(f).unwrap();

        assert!(matches!(e.close_node(f), Err(DumpError::UnknownNode(_))));
        assert!(matches!(e.close_node(NodeId(99)), Err(DumpError::UnknownNode(99))));
    }

    #[test]
    fn test_content_on_directory_rejected() {
        let dir = TempDir::new().unwrap();
        let mut writer = DumpWriter::new(Vec::new());
        let mut e = DumpEditor::new(&mut writer, dir.path(), 1, false);

        let root = e.open_root(0).unwrap();
        let d = e.add_node(root, "d", NodeKind::Dir).unwrap();
        let err = e.apply_content(d, &mut Cursor::new(b"x".to_vec())).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_close_edit_with_open_nodes_fails() {
        let dir = TempDir::new().unwrap();
        let mut writer = DumpWriter::new(Vec::new());
        let mut e = DumpEditor::new(&mut writer, dir.path(), 1, false);

        let root = e.open_root(0).unwrap();
        e.add_node(root, "f", NodeKind::File).unwrap();
        e.close_node(root).unwrap();
        assert!(e.close_edit().is_err());
    }

    #[test]
    fn test_abort_releases_spools_and_fails_finish() {
        let dir = TempDir::new().unwrap();
        let mut writer = DumpWriter::new(Vec::new());
        {
            let mut e = DumpEditor::new(&mut writer, dir.path(), 4, false);
            let root = e.open_root(3).unwrap();
            let f = e.add_node(root, "f", NodeKind::File).unwrap();
            e.apply_content(f, &mut Cursor::new(vec![0u8; 128])).unwrap();
            e.abort().unwrap();

            assert!(e.is_aborted());
            assert!(matches!(e.finish(), Err(DumpError::Aborted { revision: 4 })));
            assert!(e.add_node(root, "g", NodeKind::File).is_err());
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn test_finish_requires_close_edit() {
        let dir = TempDir::new().unwrap();
        let mut writer = DumpWriter::new(Vec::new());
        let mut e = DumpEditor::new(&mut writer, dir.path(), 1, false);
        e.open_root(0).unwrap();
        assert!(e.finish().is_err());
    }

    #[test]
    fn test_records_counted() {
        let dir = TempDir::new().unwrap();
        let mut writer = DumpWriter::new(Vec::new());
        let mut e = DumpEditor::new(&mut writer, dir.path(), 1, false);
        let root = e.open_root(0).unwrap();
        e.delete_node(root, "x").unwrap();
        let f = e.add_node(root, "y", NodeKind::File).unwrap();
        e.close_node(f).unwrap();
        e.close_node(root).unwrap();
        e.close_edit().unwrap();
        assert_eq!(e.records_written(), 2);
        assert!(e.finish().is_ok());
    }
}
