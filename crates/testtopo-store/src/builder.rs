//! Build nested tree objects from a flat list of file paths.

use std::collections::BTreeMap;

use testtopo_types::ObjectId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, EntryMode, Tree, TreeEntry};
use crate::traits::ObjectStore;

#[derive(Clone, Debug)]
enum Node {
    File { data: Vec<u8>, mode: EntryMode },
    Dir(BTreeMap<String, Node>),
}

/// Mutable staging area for a snapshot.
///
/// Files are inserted by slash-separated path; [`TreeBuilder::write`] stores
/// every blob and tree bottom-up and returns the root tree id. Cloning a
/// builder and editing the clone is the cheap way to derive the next snapshot
/// in a fixture history.
#[derive(Clone, Debug, Default)]
pub struct TreeBuilder {
    root: BTreeMap<String, Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a regular file.
    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>) -> StoreResult<&mut Self> {
        self.insert_with_mode(path, data, EntryMode::Regular)
    }

    /// Insert or replace a file with an explicit mode.
    ///
    /// Any file standing where a directory is needed is replaced by that
    /// directory, and vice versa.
    pub fn insert_with_mode(
        &mut self,
        path: &str,
        data: impl Into<Vec<u8>>,
        mode: EntryMode,
    ) -> StoreResult<&mut Self> {
        if mode.is_tree() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        let (dirs, name) = split_path(path)?;
        let mut level = &mut self.root;
        for dir in dirs {
            let node = level
                .entry(dir.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            if matches!(node, Node::File { .. }) {
                *node = Node::Dir(BTreeMap::new());
            }
            level = match node {
                Node::Dir(children) => children,
                Node::File { .. } => unreachable!("file nodes were replaced above"),
            };
        }
        level.insert(
            name.to_string(),
            Node::File {
                data: data.into(),
                mode,
            },
        );
        Ok(self)
    }

    /// Remove a file or a whole directory. Returns `true` if anything was removed.
    ///
    /// Directories left empty by the removal are pruned.
    pub fn remove(&mut self, path: &str) -> StoreResult<bool> {
        let (dirs, name) = split_path(path)?;
        Ok(remove_in(&mut self.root, &dirs, name))
    }

    /// Write every object and return the root tree id.
    pub fn write(&self, store: &dyn ObjectStore) -> StoreResult<ObjectId> {
        write_dir(store, &self.root)
    }

    /// Write the snapshot and a commit pointing at it.
    pub fn commit(
        &self,
        store: &dyn ObjectStore,
        parents: Vec<ObjectId>,
        message: &str,
        timestamp: i64,
    ) -> StoreResult<ObjectId> {
        let tree = self.write(store)?;
        let commit = Commit::new(tree, parents, message).with_timestamp(timestamp);
        let id = store.write(&commit.to_stored_object()?)?;
        debug!(commit = %id.short_hex(), tree = %tree.short_hex(), "wrote commit");
        Ok(id)
    }
}

fn split_path(path: &str) -> StoreResult<(Vec<&str>, &str)> {
    let mut parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    let name = parts.pop().ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
    Ok((parts, name))
}

fn remove_in(level: &mut BTreeMap<String, Node>, dirs: &[&str], name: &str) -> bool {
    match dirs.split_first() {
        None => level.remove(name).is_some(),
        Some((head, rest)) => {
            let Some(Node::Dir(children)) = level.get_mut(*head) else {
                return false;
            };
            let removed = remove_in(children, rest, name);
            if removed && children.is_empty() {
                level.remove(*head);
            }
            removed
        }
    }
}

fn write_dir(store: &dyn ObjectStore, children: &BTreeMap<String, Node>) -> StoreResult<ObjectId> {
    let mut entries = Vec::with_capacity(children.len());
    for (name, node) in children {
        let entry = match node {
            Node::File { data, mode } => {
                let id = store.write(&Blob::new(data.clone()).to_stored_object())?;
                TreeEntry::new(*mode, name.clone(), id)
            }
            Node::Dir(grandchildren) => {
                let id = write_dir(store, grandchildren)?;
                TreeEntry::new(EntryMode::Directory, name.clone(), id)
            }
        };
        entries.push(entry);
    }
    store.write(&Tree::new(entries).to_stored_object()?)
}
