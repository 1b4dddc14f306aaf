//! Error types for the history crate.

use testtopo_diff::DiffError;
use testtopo_resolver::ResolverError;
use testtopo_store::StoreError;

/// Errors that fail one logical change or one oracle lookup.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed oracle output: {0}")]
    OracleOutput(#[from] serde_json::Error),

    #[error("oracle failed: {0}")]
    Oracle(String),
}

pub type HistoryResult<T> = Result<T, HistoryError>;
