use serde::{Deserialize, Serialize};
use canopy_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Directory listing: sorted entries mapping names to object ids.
    Tree,
    /// Snapshot pointer naming a root tree.
    Commit,
}

impl ObjectKind {
    /// Domain tag mixed into the content hash of objects of this kind.
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Blob => "canopy-blob-v1",
            Self::Tree => "canopy-tree-v1",
            Self::Commit => "canopy-commit-v1",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// A stored object: kind tag + serialized data.
///
/// `StoredObject` is the unit of storage. The store itself never interprets
/// `data`; typed views decode it on demand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Compute the content-addressed id for this object.
    pub fn compute_id(&self) -> ObjectId {
        ObjectId::hash_with_domain(self.kind.domain(), &self.data)
    }

    fn expect_kind(&self, expected: ObjectKind) -> StoreResult<()> {
        if self.kind != expected {
            return Err(StoreError::UnexpectedKind {
                id: self.compute_id(),
                expected,
                actual: self.kind,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw file content.
///
/// Status computation never reads blobs: the entry kind and id carried by the
/// parent tree are enough. Blobs exist so that test fixtures and embedders
/// can mint realistic ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Kind of a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
    /// Subtree (0o040000).
    Directory,
    /// Pointer to a commit in another repository (0o160000).
    Submodule,
}

impl FileType {
    /// Octal mode value (for display/serialization).
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
            Self::Submodule => 0o160000,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            0o120000 => Some(Self::Symlink),
            0o040000 => Some(Self::Directory),
            0o160000 => Some(Self::Submodule),
            _ => None,
        }
    }

    /// Only directories have children the diff engine descends into.
    /// Submodules are leaves.
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Regular and executable files differ only by their mode bit.
    pub fn is_regular_or_executable(&self) -> bool {
        matches!(self, Self::Regular | Self::Executable)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single named child of a tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub id: ObjectId,
    pub kind: FileType,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, id: ObjectId, kind: FileType) -> Self {
        Self {
            name: name.into(),
            id,
            kind,
        }
    }

    pub fn is_tree(&self) -> bool {
        self.kind.is_tree()
    }
}

/// Immutable directory snapshot.
///
/// Entries are kept in byte-wise name order with no duplicates. [`Tree::new`]
/// establishes the order; anything decoded from storage is checked with
/// [`Tree::validate`] before it is trusted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a tree, sorting entries by name.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Check the sorted, duplicate-free entry invariant.
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        for pair in self.entries.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            match prev.name.as_bytes().cmp(next.name.as_bytes()) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    return Err(format!("duplicate entry name `{}`", next.name));
                }
                std::cmp::Ordering::Greater => {
                    return Err(format!(
                        "entry `{}` sorts before preceding entry `{}`",
                        next.name, prev.name
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Tree)?;
        serde_json::from_slice(&obj.data).map_err(|e| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: e.to_string(),
        })
    }

    /// The id this tree has (or would have) in a store.
    pub fn compute_id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A snapshot: names the root tree and the commits it descends from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub root_tree: ObjectId,
    #[serde(default)]
    pub parents: Vec<ObjectId>,
    #[serde(default)]
    pub message: String,
}

impl Commit {
    pub fn new(root_tree: ObjectId) -> Self {
        Self {
            root_tree,
            parents: Vec::new(),
            message: String::new(),
        }
    }

    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Commit, data))
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Commit)?;
        serde_json::from_slice(&obj.data).map_err(|e| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: e.to_string(),
        })
    }
}
