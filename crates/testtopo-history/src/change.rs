//! Logical changes and the contiguous commit runs they are made of.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use testtopo_diff::{PathsByKind, TreeDiff};
use testtopo_store::ObjectStore;
use testtopo_types::{path, ChangeKind, ObjectId};

use crate::error::HistoryResult;

/// The commits that landed for one bug.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalChange {
    pub id: String,
    pub date: DateTime<Utc>,
    /// Newest first.
    pub commits: Vec<ObjectId>,
}

impl LogicalChange {
    pub fn new(id: impl Into<String>, date: DateTime<Utc>, commits: Vec<ObjectId>) -> Self {
        Self {
            id: id.into(),
            date,
            commits,
        }
    }
}

/// Commits where each one's first parent is the next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRun {
    /// Newest first.
    pub commits: Vec<ObjectId>,
    /// First parent of the oldest commit; `None` for a root commit.
    pub base: Option<ObjectId>,
}

impl CommitRun {
    pub fn head(&self) -> &ObjectId {
        &self.commits[0]
    }
}

/// Split newest-first `commits` into contiguous first-parent runs.
///
/// Commits of one bug are often interleaved with unrelated landings; each run
/// is a stretch whose combined effect is a single base-to-head diff.
pub fn group_commit_runs(
    store: &dyn ObjectStore,
    commits: &[ObjectId],
) -> HistoryResult<Vec<CommitRun>> {
    let mut runs: Vec<CommitRun> = Vec::new();
    for id in commits {
        let parent = store.read_commit(id)?.first_parent().copied();
        match runs.last_mut() {
            Some(run) if run.base.as_ref() == Some(id) => {
                run.commits.push(*id);
                run.base = parent;
            }
            _ => runs.push(CommitRun {
                commits: vec![*id],
                base: parent,
            }),
        }
    }
    Ok(runs)
}

/// Group diff paths by status, dropping files whose extension rules them out
/// as tests.
pub fn candidate_test_paths(diff: &TreeDiff, skip_extensions: &BTreeSet<String>) -> PathsByKind {
    let mut paths = PathsByKind::new();
    for kind in [ChangeKind::Added, ChangeKind::Modified, ChangeKind::Deleted] {
        paths.insert(kind, BTreeSet::new());
    }
    for (repo_path, change) in diff.iter() {
        let skipped = path::file_name(repo_path)
            .rsplit_once('.')
            .is_some_and(|(_, ext)| skip_extensions.contains(ext));
        if !skipped {
            paths
                .entry(change.kind)
                .or_default()
                .insert(repo_path.to_string());
        }
    }
    paths
}

/// Returns `true` if no status holds any path.
pub fn is_empty(paths: &PathsByKind) -> bool {
    paths.values().all(BTreeSet::is_empty)
}
