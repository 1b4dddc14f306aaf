//! Error types for the resolver crate.

use testtopo_diff::DiffError;
use testtopo_store::StoreError;

/// Failures that abort an `update`.
///
/// Malformed or missing manifests are not errors at this level; they go to
/// the [`DiagnosticSink`](crate::DiagnosticSink) and resolution continues.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),
}

pub type ResolverResult<T> = Result<T, ResolverError>;
