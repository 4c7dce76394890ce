//! Content-addressed object storage for canopy.
//!
//! This crate defines the object model the diff engine walks (trees of named,
//! typed entries, and commits naming a root tree) and the read interface the
//! engine consumes. Every object is immutable and identified by the
//! domain-separated BLAKE3 hash of its encoding.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- sorted directory listing of [`TreeEntry`] values
//! - [`Commit`] -- snapshot pointer to a root tree
//!
//! # Storage Backends
//!
//! All backends implement the async [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, FileType, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
