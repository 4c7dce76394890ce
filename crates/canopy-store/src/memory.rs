use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use canopy_types::ObjectId;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, StoredObject, Tree};
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Raw objects live behind one `RwLock`;
/// decoded trees are cached behind another so repeated fetches of the same
/// tree hand out the same `Arc<Tree>`.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    trees: RwLock<HashMap<ObjectId, Arc<Tree>>>,
    tree_fetches: AtomicUsize,
}

impl InMemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            trees: RwLock::new(HashMap::new()),
            tree_fetches: AtomicUsize::new(0),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Number of `get_tree` calls served so far, hits and misses alike.
    pub fn tree_fetches(&self) -> usize {
        self.tree_fetches.load(Ordering::Relaxed)
    }

    /// Write an object and return its id. Writing the same content twice is
    /// a no-op.
    pub fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }

    /// Store raw file content as a blob.
    pub fn write_blob(&self, data: impl Into<Vec<u8>>) -> StoreResult<ObjectId> {
        self.write(&Blob::new(data).to_stored_object())
    }

    /// Encode and store a tree.
    pub fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write(&tree.to_stored_object()?)
    }

    /// Encode and store a commit.
    pub fn write_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        self.write(&commit.to_stored_object()?)
    }

    fn read(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_tree(&self, id: &ObjectId) -> StoreResult<Arc<Tree>> {
        self.tree_fetches.fetch_add(1, Ordering::Relaxed);
        if let Some(tree) = self.trees.read().expect("lock poisoned").get(id) {
            return Ok(Arc::clone(tree));
        }

        let stored = self.read(id)?;
        let tree = Arc::new(Tree::from_stored_object(&stored)?);
        trace!(tree = %id.short_hex(), entries = tree.len(), "decoded tree");

        let mut cache = self.trees.write().expect("lock poisoned");
        Ok(Arc::clone(cache.entry(*id).or_insert(tree)))
    }

    async fn get_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        Commit::from_stored_object(&self.read(id)?)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .field("tree_fetches", &self.tree_fetches())
            .finish()
    }
}
