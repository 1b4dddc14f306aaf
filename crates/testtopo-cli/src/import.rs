//! Loading directory snapshots into the in-memory store.

use std::fs;
use std::path::Path;

use anyhow::Context;
use testtopo_store::{ObjectStore, TreeBuilder};
use testtopo_types::ObjectId;
use tracing::debug;
use walkdir::WalkDir;

const SKIPPED_DIRS: [&str; 2] = [".git", ".hg"];

/// Commit every regular file under `dir` and return the commit id.
pub fn import_dir(
    store: &dyn ObjectStore,
    dir: &Path,
    parents: Vec<ObjectId>,
) -> anyhow::Result<ObjectId> {
    let mut builder = TreeBuilder::new();
    let mut files = 0usize;
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !SKIPPED_DIRS
                    .iter()
                    .any(|skip| entry.file_name().to_str() == Some(*skip))
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir)?;
        let repo_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let data = fs::read(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))?;
        builder.insert(&repo_path, data)?;
        files += 1;
    }

    let message = format!("snapshot of {}", dir.display());
    let commit = builder.commit(store, parents, &message, 0)?;
    debug!(dir = %dir.display(), files, commit = %commit.short_hex(), "imported snapshot");
    Ok(commit)
}
