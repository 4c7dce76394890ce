//! Concurrent tree diff engine for Canopy.
//!
//! Compares two content-addressed directory trees (or the root trees of two
//! commits) and reports which paths were added, removed, or modified.
//! Unchanged subtrees are recognized by id and never fetched, and differing
//! subtrees are compared in parallel under a bounded number of in-flight
//! fetches.
//!
//! # Key Types
//!
//! - [`DiffContext`] -- store, callback, ignore policy, config, and cancellation for one diff
//! - [`DiffCallback`] -- sink for per-path events; [`StatusAggregator`] and [`ChannelCallback`] ship with the crate
//! - [`IgnoreFilter`] / [`GitignoreFilter`] -- path exclusion policy
//! - [`ScmStatus`] / [`ScmFileStatus`] -- aggregated per-path result
//! - [`CommitDiff`] -- commit-level entry point
//!
//! # Example
//!
//! ```no_run
//! # async fn run(store: std::sync::Arc<dyn canopy_store::ObjectStore>,
//! #              old: canopy_types::ObjectId, new: canopy_types::ObjectId)
//! #              -> canopy_diff::DiffResult<()> {
//! let status = canopy_diff::diff_commits_for_status(store, &old, &new).await?;
//! for path in status.paths_with(canopy_diff::ScmFileStatus::MODIFIED) {
//!     println!("M {path}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod commit;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod gitignore;
pub mod status;
pub mod tree_diff;

#[cfg(test)]
pub(crate) mod testutil;

pub use commit::{diff_commits_for_status, CommitDiff};
pub use config::{
    DiffConfig, DirectoryReport, DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_MAX_SUBTREE_TASKS,
};
pub use context::{DiffCallback, DiffContext, IgnoreDecision, IgnoreFilter, IncludeAll};
pub use error::{DiffError, DiffResult};
pub use events::{ChannelCallback, DiffEvent};
pub use gitignore::GitignoreFilter;
pub use status::{ChangeKind, ScmFileStatus, ScmStatus, StatusAggregator};
pub use tree_diff::{diff_trees, TreeSource};
