//! Commit-to-commit status.
//!
//! [`CommitDiff`] resolves both commits to their root trees, runs the tree
//! comparator into a [`StatusAggregator`], and hands back the finished
//! [`ScmStatus`].

use std::sync::Arc;

use canopy_store::ObjectStore;
use canopy_types::ObjectId;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::DiffConfig;
use crate::context::{DiffContext, IgnoreFilter, IncludeAll};
use crate::error::{DiffError, DiffResult};
use crate::status::{ScmStatus, StatusAggregator};
use crate::tree_diff::diff_trees;

/// Reusable settings for computing commit statuses against one store.
///
/// Each call to [`status`](Self::status) gets its own context, so one
/// `CommitDiff` can serve many diffs, concurrently or not. They share the
/// cancellation token, however.
#[derive(Clone)]
pub struct CommitDiff {
    store: Arc<dyn ObjectStore>,
    config: DiffConfig,
    ignore: Arc<dyn IgnoreFilter>,
    cancellation: CancellationToken,
}

impl CommitDiff {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            config: DiffConfig::default(),
            ignore: Arc::new(IncludeAll),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: DiffConfig) -> DiffResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_ignore(mut self, ignore: Arc<dyn IgnoreFilter>) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Compute the status of `new` relative to `old`.
    ///
    /// Fails only if either commit cannot be resolved or the diff is
    /// cancelled. Subtree failures show up in [`ScmStatus::errors`].
    pub async fn status(&self, old: &ObjectId, new: &ObjectId) -> DiffResult<ScmStatus> {
        debug!(old = %old.short_hex(), new = %new.short_hex(), "computing commit status");

        let (old_root, new_root) =
            tokio::try_join!(self.resolve_root(old), self.resolve_root(new))?;

        let aggregator = Arc::new(StatusAggregator::new());
        let context = DiffContext::new(Arc::clone(&self.store), aggregator.clone())
            .with_config(self.config.clone())?
            .with_ignore(Arc::clone(&self.ignore))
            .with_cancellation(self.cancellation.clone());

        diff_trees(Arc::new(context), old_root, new_root).await?;

        let status = aggregator.take_status();
        debug!(
            changed = status.len(),
            errors = status.errors.len(),
            "commit status computed"
        );
        Ok(status)
    }

    async fn resolve_root(&self, commit: &ObjectId) -> DiffResult<ObjectId> {
        tokio::select! {
            _ = self.cancellation.cancelled() => Err(DiffError::Cancelled),
            resolved = self.store.get_root_tree(commit) => {
                resolved.map_err(|source| DiffError::Resolution { commit: *commit, source })
            }
        }
    }
}

impl std::fmt::Debug for CommitDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitDiff")
            .field("config", &self.config)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

/// Compute the status between two commits with default settings.
pub async fn diff_commits_for_status(
    store: Arc<dyn ObjectStore>,
    old: &ObjectId,
    new: &ObjectId,
) -> DiffResult<ScmStatus> {
    CommitDiff::new(store).status(old, new).await
}
