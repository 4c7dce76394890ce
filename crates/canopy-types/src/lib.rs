//! Foundation types for canopy.
//!
//! Every other canopy crate depends on `canopy-types` for the content
//! address used to name trees, blobs, and commits.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- fixed-width BLAKE3 content address
//! - [`TypeError`] -- parse failures for identifiers

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, OBJECT_ID_LEN};
