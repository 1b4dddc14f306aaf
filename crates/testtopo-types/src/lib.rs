//! Foundation types for testtopo.
//!
//! This crate provides the identity and classification types used throughout
//! the workspace. Every other testtopo crate depends on `testtopo-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (BLAKE3 hash)
//! - [`SuiteKind`]: The fixed set of test suites the resolver tracks
//! - [`ChangeKind`]: Added / Modified / Deleted path status
//! - [`path`]: Repository-relative path joining and normalization

pub mod error;
pub mod object;
pub mod path;
pub mod suite;

pub use error::TypeError;
pub use object::ObjectId;
pub use suite::{ChangeKind, ManifestFormat, SuiteKind};
