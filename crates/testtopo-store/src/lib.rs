//! Content-addressed object storage for testtopo.
//!
//! The resolver treats version-control history as a read-only graph of
//! immutable objects identified by BLAKE3 hash (domain-separated by object
//! kind). This crate is the seam to that graph: the [`ObjectStore`] trait is
//! what a real repository binding implements, and [`InMemoryObjectStore`]
//! backs tests, fixtures, and directory snapshots.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file contents
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- root tree plus parent links
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Equal ids mean equal content, transitively for trees.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod builder;
pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use builder::TreeBuilder;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
