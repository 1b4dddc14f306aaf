//! Error types for the diff crate.

use testtopo_types::ObjectId;

/// Errors that can occur during diff operations.
///
/// Every variant belongs to the store-failure class: the snapshot being walked
/// is incomplete or unreadable, so the diff cannot be trusted at all.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A tree referenced during the walk was not found in the store.
    #[error("tree not found: {0:?}")]
    ObjectNotFound(ObjectId),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] testtopo_store::StoreError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
