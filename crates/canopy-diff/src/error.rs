//! Error types for the diff crate.

use canopy_store::StoreError;
use canopy_types::ObjectId;

/// Errors that can occur during diff operations.
///
/// `Fetch` and `MalformedTree` are scoped to one subtree: the comparator
/// hands them to [`DiffCallback::error`](crate::DiffCallback::error) and
/// carries on with the rest of the tree. `Resolution`, `Cancelled`, and the
/// configuration errors fail the whole call.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The store could not produce a tree for this id.
    #[error("failed to fetch tree {id}: {source}")]
    Fetch {
        id: ObjectId,
        #[source]
        source: StoreError,
    },

    /// A commit could not be resolved to its root tree.
    #[error("cannot resolve commit {commit} to a root tree: {source}")]
    Resolution {
        commit: ObjectId,
        #[source]
        source: StoreError,
    },

    /// A tree's entries are unsorted or contain duplicate names.
    #[error("malformed tree {id}: {reason}")]
    MalformedTree { id: ObjectId, reason: String },

    /// The diff's cancellation token fired before it finished.
    #[error("diff cancelled")]
    Cancelled,

    #[error("invalid diff configuration: {0}")]
    Config(String),

    #[error("invalid ignore pattern: {0}")]
    IgnorePattern(String),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
