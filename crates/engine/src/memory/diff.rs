//! Tree diff driver for the in-memory backend
//!
//! Walks the base and target trees below the session root in sorted name
//! order and reports the differences to a [`TreeEditSink`]. Unchanged
//! subtrees are skipped; directories are opened only when something below
//! them changed.

use super::{is_within, join, svndiff, Entry, MemoryRepository, Tree};
use crate::access::{DiffBase, DiffRequest, NodeId, TreeEditSink};
use revdump_core::{DumpError, DumpResult, NodeKind};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Name of `key` if it is a direct child of `dir`
fn child_name<'k>(key: &'k str, dir: &str) -> Option<&'k str> {
    let rest = if dir.is_empty() {
        key
    } else {
        key.strip_prefix(dir)?.strip_prefix('/')?
    };
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

fn children<'t>(tree: &'t Tree, dir: &str) -> impl Iterator<Item = &'t str> + 't {
    let dir = dir.to_string();
    tree.keys().filter_map(move |k| child_name(k, &dir))
}

struct TreeDiff<'a> {
    base: &'a Tree,
    target: &'a Tree,
    replaced: BTreeSet<&'a str>,
    deltas: bool,
}

impl<'a> TreeDiff<'a> {
    fn subtree_changed(&self, path: &str) -> bool {
        let base = self.base.iter().filter(|(k, _)| is_within(k, path));
        let target = self.target.iter().filter(|(k, _)| is_within(k, path));
        !base.eq(target)
    }

    fn send_content(&self, sink: &mut dyn TreeEditSink, id: NodeId, content: &[u8]) -> DumpResult<()> {
        let encoded = if self.deltas {
            svndiff::encode_fulltext(content)
        } else {
            content.to_vec()
        };
        sink.apply_content(id, &mut encoded.as_slice())
    }

    fn diff_props(
        &self,
        sink: &mut dyn TreeEditSink,
        id: NodeId,
        base: &BTreeMap<String, Vec<u8>>,
        target: &BTreeMap<String, Vec<u8>>,
    ) -> DumpResult<()> {
        let keys: BTreeSet<&String> = base.keys().chain(target.keys()).collect();
        for key in keys {
            match (base.get(key), target.get(key)) {
                (Some(_), None) => sink.change_property(id, key, None)?,
                (old, Some(new)) if old != Some(new) => sink.change_property(id, key, Some(new.as_slice()))?,
                _ => {}
            }
        }
        Ok(())
    }

    fn add(
        &self,
        sink: &mut dyn TreeEditSink,
        parent: NodeId,
        rel: &str,
        abs: &str,
        entry: &Entry,
        replace: bool,
    ) -> DumpResult<()> {
        let id = if replace {
            sink.replace_node(parent, rel, entry.kind)?
        } else {
            sink.add_node(parent, rel, entry.kind)?
        };
        for (key, value) in &entry.props {
            sink.change_property(id, key, Some(value.as_slice()))?;
        }
        match entry.kind {
            NodeKind::File => self.send_content(sink, id, &entry.content)?,
            NodeKind::Dir => {
                for name in children(self.target, abs) {
                    let child_abs = join(abs, name);
                    if let Some(child) = self.target.get(&child_abs) {
                        self.add(sink, id, &join(rel, name), &child_abs, child, false)?;
                    }
                }
            }
        }
        sink.close_node(id)
    }

    fn modify(
        &self,
        sink: &mut dyn TreeEditSink,
        parent: NodeId,
        rel: &str,
        abs: &str,
        base: &Entry,
        target: &Entry,
    ) -> DumpResult<()> {
        let id = sink.open_node(parent, rel, target.kind)?;
        self.diff_props(sink, id, &base.props, &target.props)?;
        match target.kind {
            NodeKind::Dir => self.diff_dir(sink, id, rel, abs, None)?,
            NodeKind::File => {
                if base.content != target.content {
                    self.send_content(sink, id, &target.content)?;
                }
            }
        }
        sink.close_node(id)
    }

    fn diff_dir(
        &self,
        sink: &mut dyn TreeEditSink,
        id: NodeId,
        rel: &str,
        abs: &str,
        only: Option<&str>,
    ) -> DumpResult<()> {
        let names: BTreeSet<&str> = children(self.base, abs).chain(children(self.target, abs)).collect();
        for name in names {
            if only.map_or(false, |o| o != name) {
                continue;
            }
            let child_abs = join(abs, name);
            let child_rel = join(rel, name);
            match (self.base.get(&child_abs), self.target.get(&child_abs)) {
                (None, None) => {}
                (Some(_), None) => sink.delete_node(id, &child_rel)?,
                (None, Some(t)) => self.add(sink, id, &child_rel, &child_abs, t, false)?,
                (Some(b), Some(t)) => {
                    if b.kind != t.kind || self.replaced.contains(child_abs.as_str()) {
                        self.add(sink, id, &child_rel, &child_abs, t, true)?;
                    } else if self.subtree_changed(&child_abs) {
                        self.modify(sink, id, &child_rel, &child_abs, b, t)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn diff_root(&self, sink: &mut dyn TreeEditSink, id: NodeId, root: &str, only: Option<&str>) -> DumpResult<()> {
        let none = BTreeMap::new();
        let base_props = self.base.get(root).map_or(&none, |e| &e.props);
        let target_props = self.target.get(root).map_or(&none, |e| &e.props);
        self.diff_props(sink, id, base_props, target_props)?;
        self.diff_dir(sink, id, "", root, only)
    }
}

/// Report the diff described by `request` to `sink`
pub(super) fn run(repo: &MemoryRepository, request: &DiffRequest, sink: &mut dyn TreeEditSink) -> DumpResult<()> {
    let target = repo.revision(request.target)?;
    let empty = Tree::new();
    let base = match request.base {
        DiffBase::Empty => &empty,
        DiffBase::Revision(rev) => &repo.revision(rev)?.tree,
    };

    let replaced: BTreeSet<&str> = match request.base {
        DiffBase::Revision(rev) if rev < request.target => repo.revisions
            [(rev + 1) as usize..=request.target as usize]
            .iter()
            .flat_map(|r| r.replaced.iter().map(String::as_str))
            .collect(),
        _ => BTreeSet::new(),
    };

    let diff = TreeDiff {
        base,
        target: &target.tree,
        replaced,
        deltas: request.deltas,
    };

    debug!(base = ?request.base, target = request.target, root = %repo.root, "running tree diff");
    let root = sink.open_root(request.base.revision())?;
    let outcome = diff
        .diff_root(sink, root, &repo.root, request.target_name.as_deref())
        .and_then(|()| match repo.fail_diff_at {
            Some(rev) if rev == request.target => Err(DumpError::DiffFailed {
                revision: rev,
                reason: "injected failure".to_string(),
            }),
            _ => Ok(()),
        });

    if let Err(err) = outcome {
        if let Err(abort_err) = sink.abort() {
            debug!(error = %abort_err, "abort failed");
        }
        return Err(err);
    }
    sink.close_node(root)?;
    sink.close_edit()
}
