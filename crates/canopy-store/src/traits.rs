use std::sync::Arc;

use async_trait::async_trait;
use canopy_types::ObjectId;

use crate::error::StoreResult;
use crate::object::{Commit, Tree};

/// Read side of a content-addressed object store, as seen by the diff engine.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable. A given id always yields the same tree.
/// - Concurrent fetches are safe; the engine issues many at once.
/// - Retry, caching, and transport policy live behind this trait. Callers
///   treat every error as final for that id.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a tree by id.
    ///
    /// Returns [`StoreError::NotFound`] if no such object exists, and
    /// [`StoreError::UnexpectedKind`] if the id names a non-tree object.
    /// The returned tree is shared with the store's cache, not copied.
    ///
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    /// [`StoreError::UnexpectedKind`]: crate::StoreError::UnexpectedKind
    async fn get_tree(&self, id: &ObjectId) -> StoreResult<Arc<Tree>>;

    /// Fetch a commit by id.
    async fn get_commit(&self, id: &ObjectId) -> StoreResult<Commit>;

    /// Resolve a commit to the id of its root tree.
    ///
    /// Default implementation fetches the commit. Backends that keep a
    /// commit → tree index may override.
    async fn get_root_tree(&self, commit: &ObjectId) -> StoreResult<ObjectId> {
        Ok(self.get_commit(commit).await?.root_tree)
    }
}
