//! Tree-level diff: compare two snapshots and produce a path-keyed change map.
//!
//! The walk uses an explicit work stack rather than call recursion, so tree
//! depth is bounded only by memory. Either side of a frame may be absent,
//! which models a directory that exists in only one snapshot.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use testtopo_store::{ObjectStore, StoreError, Tree};
use testtopo_types::{ChangeKind, ObjectId};
use tracing::trace;

use crate::error::{DiffError, DiffResult};

/// Paths grouped by change status.
pub type PathsByKind = BTreeMap<ChangeKind, BTreeSet<String>>;

/// The status of a single leaf path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathChange {
    pub kind: ChangeKind,
    /// Content handle on the new side; `None` for deletions.
    pub new_id: Option<ObjectId>,
}

impl PathChange {
    fn added(id: ObjectId) -> Self {
        Self {
            kind: ChangeKind::Added,
            new_id: Some(id),
        }
    }

    fn modified(id: ObjectId) -> Self {
        Self {
            kind: ChangeKind::Modified,
            new_id: Some(id),
        }
    }

    fn deleted() -> Self {
        Self {
            kind: ChangeKind::Deleted,
            new_id: None,
        }
    }
}

/// The result of comparing two trees.
///
/// A map rather than a sequence: callers never depend on order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeDiff {
    entries: BTreeMap<String, PathChange>,
}

impl TreeDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &str) -> Option<&PathChange> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PathChange)> {
        self.entries.iter().map(|(path, change)| (path.as_str(), change))
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.entries.values().filter(|c| c.kind == kind).count()
    }

    /// Group paths by status. Statuses with no paths are absent.
    pub fn paths_by_kind(&self) -> PathsByKind {
        let mut grouped = PathsByKind::new();
        for (path, change) in &self.entries {
            grouped.entry(change.kind).or_default().insert(path.clone());
        }
        grouped
    }

    pub fn insert(&mut self, path: impl Into<String>, change: PathChange) {
        self.entries.insert(path.into(), change);
    }
}

impl FromIterator<(String, PathChange)> for TreeDiff {
    fn from_iter<I: IntoIterator<Item = (String, PathChange)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

struct Frame {
    old: Option<ObjectId>,
    new: Option<ObjectId>,
    prefix: String,
}

/// Compare two trees read from `store`.
///
/// - `old_tree`: the previous snapshot (or `None` for an empty tree).
/// - `new_tree`: the current snapshot (or `None` for an empty tree).
///
/// Paths present only in `new_tree` are Added, paths present only in
/// `old_tree` are Deleted, and leaves whose ids differ are Modified. A leaf
/// replaced by a directory (or the reverse) is reported as the leaf being
/// Deleted/Added alongside the directory's contents, which keeps
/// `diff(a, b)` and `diff(b, a)` exact mirrors. The snapshots need not share
/// any history.
pub fn diff_trees(
    store: &dyn ObjectStore,
    old_tree: Option<&ObjectId>,
    new_tree: Option<&ObjectId>,
) -> DiffResult<TreeDiff> {
    let mut diff = TreeDiff::new();
    let mut stack = vec![Frame {
        old: old_tree.copied(),
        new: new_tree.copied(),
        prefix: String::new(),
    }];

    while let Some(frame) = stack.pop() {
        if let (Some(old), Some(new)) = (&frame.old, &frame.new) {
            if old == new {
                continue;
            }
        }
        let old = load(store, frame.old.as_ref())?;
        let new = load(store, frame.new.as_ref())?;
        trace!(prefix = %frame.prefix, old = old.len(), new = new.len(), "diffing subtree");

        for entry in &new.entries {
            let path = child_path(&frame.prefix, &entry.name);
            let counterpart = old.get(&entry.name);
            if entry.is_tree() {
                stack.push(Frame {
                    old: counterpart.filter(|e| e.is_tree()).map(|e| e.object_id),
                    new: Some(entry.object_id),
                    prefix: path,
                });
                continue;
            }
            match counterpart {
                Some(prev) if !prev.is_tree() => {
                    if prev.object_id != entry.object_id {
                        diff.insert(path, PathChange::modified(entry.object_id));
                    }
                }
                _ => diff.insert(path, PathChange::added(entry.object_id)),
            }
        }

        for entry in &old.entries {
            let counterpart = new.get(&entry.name);
            if counterpart.is_some_and(|e| e.is_tree() == entry.is_tree()) {
                continue;
            }
            let path = child_path(&frame.prefix, &entry.name);
            if entry.is_tree() {
                stack.push(Frame {
                    old: Some(entry.object_id),
                    new: None,
                    prefix: path,
                });
            } else {
                diff.insert(path, PathChange::deleted());
            }
        }
    }

    Ok(diff)
}

/// List every leaf below `root` as Added.
pub fn list_tree(store: &dyn ObjectStore, root: &ObjectId) -> DiffResult<TreeDiff> {
    diff_trees(store, None, Some(root))
}

/// Diff the root trees of two commits.
pub fn diff_commits(
    store: &dyn ObjectStore,
    old_commit: &ObjectId,
    new_commit: &ObjectId,
) -> DiffResult<TreeDiff> {
    let old = store.read_commit(old_commit).map_err(not_found)?;
    let new = store.read_commit(new_commit).map_err(not_found)?;
    diff_trees(store, Some(&old.tree), Some(&new.tree))
}

fn load(store: &dyn ObjectStore, id: Option<&ObjectId>) -> DiffResult<Tree> {
    match id {
        Some(id) => store.read_tree(id).map_err(not_found),
        None => Ok(Tree::empty()),
    }
}

fn not_found(err: StoreError) -> DiffError {
    match err {
        StoreError::NotFound(id) => DiffError::ObjectNotFound(id),
        other => DiffError::Store(other),
    }
}

fn child_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
