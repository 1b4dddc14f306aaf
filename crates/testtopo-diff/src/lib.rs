//! Structural diff engine for testtopo.
//!
//! Compares two tree snapshots from the same content-addressed store and
//! produces a path-keyed change map. Subtrees whose ids match are skipped
//! without being read, so the cost of a diff tracks the size of the change
//! rather than the size of the tree.
//!
//! # Key Types
//!
//! - [`TreeDiff`] / [`PathChange`] -- path -> Added/Modified/Deleted map
//! - [`diff_trees`] / [`diff_commits`] / [`list_tree`] -- entry points

pub mod error;
pub mod tree_diff;

pub use error::{DiffError, DiffResult};
pub use tree_diff::{diff_commits, diff_trees, list_tree, PathChange, PathsByKind, TreeDiff};
