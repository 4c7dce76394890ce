use canopy_types::ObjectId;

use crate::object::ObjectKind;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The object exists but is not of the kind the caller asked for.
    #[error("object {id} is a {actual}, expected a {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// The object data cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// Encoding an object for storage failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Attempted to write an object that hashes to the null id.
    #[error("cannot store object with null ID")]
    NullObjectId,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
