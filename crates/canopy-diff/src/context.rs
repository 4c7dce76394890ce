//! The per-diff context and the callback contract the comparator reports into.
//!
//! A [`DiffContext`] bundles everything one diff invocation needs: the store
//! trees are fetched from, the ignore policy, the [`DiffCallback`] sink, the
//! [`DiffConfig`], a cancellation token, and the two semaphores that bound
//! fan-out: one for tree fetches in flight, one for spawned subtree tasks.
//! It lives exactly as long as the diff that uses it.

use std::fmt;
use std::sync::Arc;

use canopy_store::{FileType, ObjectStore};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

use crate::config::DiffConfig;
use crate::error::{DiffError, DiffResult};

/// Sink for differences found by the comparator.
///
/// Calls are synchronous from the comparator's point of view but arrive from
/// concurrently running subtree tasks in no particular order, so
/// implementations synchronize their own state.
pub trait DiffCallback: Send + Sync {
    fn added(&self, path: &str, kind: FileType);

    fn removed(&self, path: &str, kind: FileType);

    /// `old` and `new` differ only when a file flipped between regular and
    /// executable.
    fn modified(&self, path: &str, old: FileType, new: FileType);

    /// An added path was suppressed by the ignore filter. Only called when
    /// [`DiffConfig::list_ignored`] is set.
    fn ignored(&self, _path: &str, _kind: FileType) {}

    /// The subtree rooted at `path` could not be compared. Nothing below
    /// `path` is reported.
    fn error(&self, path: &str, error: &DiffError);
}

/// Outcome of consulting the ignore policy for one path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreDecision {
    Include,
    /// Suppress the event for this exact path only.
    ExcludeFile,
    /// Suppress this path and everything beneath it.
    ExcludeDirectory,
}

/// Ignore policy consulted before any path is reported or descended into.
pub trait IgnoreFilter: Send + Sync {
    fn decide(&self, path: &str, kind: FileType) -> IgnoreDecision;
}

/// Filter that includes every path.
#[derive(Clone, Copy, Debug, Default)]
pub struct IncludeAll;

impl IgnoreFilter for IncludeAll {
    fn decide(&self, _path: &str, _kind: FileType) -> IgnoreDecision {
        IgnoreDecision::Include
    }
}

impl<F> IgnoreFilter for F
where
    F: Fn(&str, FileType) -> IgnoreDecision + Send + Sync,
{
    fn decide(&self, path: &str, kind: FileType) -> IgnoreDecision {
        self(path, kind)
    }
}

/// State for a single diff invocation.
pub struct DiffContext {
    store: Arc<dyn ObjectStore>,
    callback: Arc<dyn DiffCallback>,
    ignore: Arc<dyn IgnoreFilter>,
    config: DiffConfig,
    cancellation: CancellationToken,
    fetch_limiter: Semaphore,
    task_limiter: Arc<Semaphore>,
}

impl DiffContext {
    /// Create a context with the default config, no ignore rules, and a
    /// fresh cancellation token.
    pub fn new(store: Arc<dyn ObjectStore>, callback: Arc<dyn DiffCallback>) -> Self {
        let config = DiffConfig::default();
        Self {
            store,
            callback,
            ignore: Arc::new(IncludeAll),
            fetch_limiter: Semaphore::new(config.max_concurrent_fetches),
            task_limiter: Arc::new(Semaphore::new(config.max_subtree_tasks)),
            config,
            cancellation: CancellationToken::new(),
        }
    }

    /// Replace the config, resizing both limiters. Fails if `config` does
    /// not validate.
    pub fn with_config(mut self, config: DiffConfig) -> DiffResult<Self> {
        config.validate()?;
        self.fetch_limiter = Semaphore::new(config.max_concurrent_fetches);
        self.task_limiter = Arc::new(Semaphore::new(config.max_subtree_tasks));
        self.config = config;
        Ok(self)
    }

    /// Replace the ignore policy (the default includes every path).
    pub fn with_ignore(mut self, ignore: Arc<dyn IgnoreFilter>) -> Self {
        self.ignore = ignore;
        self
    }

    /// Tie this diff to an external token. Cancelling it stops all pending
    /// fetches and makes the diff return [`DiffError::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The store trees are fetched from.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// The config this diff runs under.
    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` once the cancellation token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Consult the ignore policy for `path`.
    pub fn should_include(&self, path: &str, kind: FileType) -> IgnoreDecision {
        self.ignore.decide(path, kind)
    }

    pub(crate) fn callback(&self) -> &dyn DiffCallback {
        self.callback.as_ref()
    }

    /// Wait for a fetch slot. Fails with [`DiffError::Cancelled`] if the
    /// token fires first.
    pub(crate) async fn acquire_fetch_permit(&self) -> DiffResult<SemaphorePermit<'_>> {
        tokio::select! {
            _ = self.cancellation.cancelled() => Err(DiffError::Cancelled),
            permit = self.fetch_limiter.acquire() => permit.map_err(|_| DiffError::Cancelled),
        }
    }

    /// Claim a slot for a spawned subtree task without waiting. `None` means
    /// the subtree should be compared in the caller's own task.
    pub(crate) fn try_reserve_task(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.task_limiter).try_acquire_owned().ok()
    }
}

impl fmt::Debug for DiffContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffContext")
            .field("config", &self.config)
            .field("cancelled", &self.is_cancelled())
            .field("available_fetches", &self.fetch_limiter.available_permits())
            .field("available_tasks", &self.task_limiter.available_permits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryReport;
    use crate::status::StatusAggregator;
    use canopy_store::InMemoryObjectStore;

    fn context() -> DiffContext {
        DiffContext::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(StatusAggregator::new()),
        )
    }

    #[test]
    fn defaults_include_everything() {
        let ctx = context();
        assert_eq!(
            ctx.should_include("any/path", FileType::Regular),
            IgnoreDecision::Include
        );
        assert_eq!(ctx.config(), &DiffConfig::default());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn closure_filters_are_accepted() {
        let ctx = context().with_ignore(Arc::new(|path: &str, kind: FileType| {
            if kind.is_tree() && path == "target" {
                IgnoreDecision::ExcludeDirectory
            } else {
                IgnoreDecision::Include
            }
        }));
        assert_eq!(
            ctx.should_include("target", FileType::Directory),
            IgnoreDecision::ExcludeDirectory
        );
        assert_eq!(
            ctx.should_include("target", FileType::Regular),
            IgnoreDecision::Include
        );
    }

    #[test]
    fn with_config_resizes_the_limiter() {
        let config = DiffConfig {
            max_concurrent_fetches: 3,
            max_subtree_tasks: 5,
            directory_report: DirectoryReport::PerFile,
            ..DiffConfig::default()
        };
        let ctx = context().with_config(config).unwrap();
        assert_eq!(ctx.fetch_limiter.available_permits(), 3);
        assert_eq!(ctx.task_limiter.available_permits(), 5);
        assert_eq!(ctx.config().directory_report, DirectoryReport::PerFile);
    }

    #[test]
    fn with_config_rejects_zero_limit() {
        let config = DiffConfig {
            max_concurrent_fetches: 0,
            ..DiffConfig::default()
        };
        assert!(matches!(
            context().with_config(config),
            Err(DiffError::Config(_))
        ));
    }

    #[test]
    fn task_reservations_are_bounded_and_released() {
        let config = DiffConfig {
            max_subtree_tasks: 2,
            ..DiffConfig::default()
        };
        let ctx = context().with_config(config).unwrap();
        let first = ctx.try_reserve_task();
        let second = ctx.try_reserve_task();
        assert!(first.is_some() && second.is_some());
        assert!(ctx.try_reserve_task().is_none());

        drop(first);
        assert!(ctx.try_reserve_task().is_some());
    }

    #[tokio::test]
    async fn permit_acquisition_observes_cancellation() {
        let config = DiffConfig {
            max_concurrent_fetches: 1,
            ..DiffConfig::default()
        };
        let ctx = context().with_config(config).unwrap();
        let held = ctx.acquire_fetch_permit().await.unwrap();

        ctx.cancellation_token().cancel();
        assert!(matches!(
            ctx.acquire_fetch_permit().await,
            Err(DiffError::Cancelled)
        ));
        drop(held);
    }
}
