//! Recursive tree comparison.
//!
//! [`diff_trees`] walks two trees in lockstep and reports per-path changes
//! through the context's [`DiffCallback`](crate::DiffCallback):
//!
//! - Subtrees with equal ids are skipped without being fetched.
//! - Both sides of a differing subtree are fetched concurrently, each fetch
//!   holding one permit of the context's fetch limiter.
//! - Entry lists are merged by name. Both lists are already sorted, so the
//!   merge is a single linear pass.
//! - Differing child directories are compared in their own tasks while the
//!   context's task limiter has room, and inside the parent's task (a bounded
//!   number at a time) once it does not. A directory's comparison finishes
//!   only after all of its children have.
//! - A subtree that cannot be fetched (or is malformed) is reported once, at
//!   its own path, and the rest of the walk carries on.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use canopy_store::{FileType, Tree, TreeEntry};
use canopy_types::ObjectId;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::config::DirectoryReport;
use crate::context::{DiffContext, IgnoreDecision};
use crate::error::{DiffError, DiffResult};

/// One side of a comparison.
#[derive(Clone, Debug)]
pub enum TreeSource {
    /// A tree to fetch from the context's store.
    Id(ObjectId),
    /// A tree the caller already holds.
    Tree(Arc<Tree>),
    /// No tree at all: every entry on the other side is one-sided.
    Empty,
}

impl TreeSource {
    fn content_id(&self) -> Option<ObjectId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Tree(tree) => tree.compute_id().ok(),
            Self::Empty => None,
        }
    }

    /// Whether both sides are known to hold identical content.
    fn is_same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Id(a), Self::Id(b)) => a == b,
            (Self::Tree(a), Self::Tree(b)) if Arc::ptr_eq(a, b) => true,
            (Self::Empty, _) | (_, Self::Empty) => false,
            _ => matches!(
                (self.content_id(), other.content_id()),
                (Some(a), Some(b)) if a == b
            ),
        }
    }
}

impl From<ObjectId> for TreeSource {
    fn from(id: ObjectId) -> Self {
        Self::Id(id)
    }
}

impl From<Arc<Tree>> for TreeSource {
    fn from(tree: Arc<Tree>) -> Self {
        Self::Tree(tree)
    }
}

impl From<Tree> for TreeSource {
    fn from(tree: Tree) -> Self {
        Self::Tree(Arc::new(tree))
    }
}

impl fmt::Display for TreeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(&id.short_hex()),
            Self::Tree(tree) => write!(f, "<tree: {} entries>", tree.len()),
            Self::Empty => f.write_str("<empty>"),
        }
    }
}

/// Compare two trees, reporting differences through `context`.
///
/// Returns once every subtree comparison has finished. Fetch failures and
/// malformed trees below the root are reported to the callback and do not
/// fail the call; only cancellation does.
pub async fn diff_trees(
    context: Arc<DiffContext>,
    old: impl Into<TreeSource>,
    new: impl Into<TreeSource>,
) -> DiffResult<()> {
    let (old, new) = (old.into(), new.into());
    debug!(old = %old, new = %new, "starting tree diff");

    let comparator = Arc::new(TreeComparator {
        context: Arc::clone(&context),
    });
    comparator.compare(String::new(), old, new).await;

    if context.is_cancelled() {
        debug!("tree diff cancelled");
        return Err(DiffError::Cancelled);
    }
    debug!("tree diff finished");
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Old,
    New,
}

struct TreeComparator {
    context: Arc<DiffContext>,
}

/// A child directory waiting to be compared.
struct Subtree {
    path: String,
    old: TreeSource,
    new: TreeSource,
}

impl TreeComparator {
    /// Compare the subtrees at `path`. Boxed because it recurses.
    fn compare(
        self: Arc<Self>,
        path: String,
        old: TreeSource,
        new: TreeSource,
    ) -> BoxFuture<'static, ()> {
        async move {
            if old.is_same_as(&new) {
                trace!(path = %path, "subtree unchanged");
                return;
            }
            if self.context.is_cancelled() {
                return;
            }

            let (old_tree, new_tree) = match tokio::try_join!(self.load(&old), self.load(&new)) {
                Ok(pair) => pair,
                Err(DiffError::Cancelled) => return,
                Err(error) => {
                    warn!(path = %path, %error, "subtree comparison failed");
                    self.context.callback().error(&path, &error);
                    return;
                }
            };

            let mut pending = Vec::new();
            self.merge(&path, &old_tree.entries, &new_tree.entries, &mut pending);
            drop((old_tree, new_tree));

            self.descend(&path, pending).await;
        }
        .boxed()
    }

    /// Compare every queued child directory and wait for all of them.
    ///
    /// A child gets its own task only if a task slot is free; the slot is
    /// held until that task ends. The rest run here, at most
    /// `max_concurrent_fetches` at a time. Inline children never wait for a
    /// task slot, so a full limiter cannot stall the walk.
    async fn descend(self: &Arc<Self>, path: &str, pending: Vec<Subtree>) {
        if pending.is_empty() {
            return;
        }

        let mut spawned = JoinSet::new();
        let mut inline = Vec::new();
        for subtree in pending {
            match self.context.try_reserve_task() {
                Some(slot) => {
                    let comparator = Arc::clone(self);
                    spawned.spawn(async move {
                        let _slot = slot;
                        comparator
                            .compare(subtree.path, subtree.old, subtree.new)
                            .await;
                    });
                }
                None => inline.push(subtree),
            }
        }
        trace!(
            path = %path,
            spawned = spawned.len(),
            inline = inline.len(),
            "descending into subtrees"
        );

        let width = self.context.config().max_concurrent_fetches;
        let local = stream::iter(inline).for_each_concurrent(width, |subtree| {
            Arc::clone(self).compare(subtree.path, subtree.old, subtree.new)
        })
        .boxed();
        let joined = async move {
            while let Some(joined) = spawned.join_next().await {
                if let Err(err) = joined {
                    if err.is_panic() {
                        std::panic::resume_unwind(err.into_panic());
                    }
                }
            }
        };
        tokio::join!(local, joined);
    }

    async fn load(&self, source: &TreeSource) -> DiffResult<Arc<Tree>> {
        let (tree, id) = match source {
            TreeSource::Empty => return Ok(Arc::new(Tree::empty())),
            TreeSource::Tree(tree) => (Arc::clone(tree), None),
            TreeSource::Id(id) => (self.fetch(id).await?, Some(*id)),
        };

        if let Err(reason) = tree.validate() {
            let id = id
                .or_else(|| tree.compute_id().ok())
                .unwrap_or_else(ObjectId::null);
            return Err(DiffError::MalformedTree { id, reason });
        }
        Ok(tree)
    }

    async fn fetch(&self, id: &ObjectId) -> DiffResult<Arc<Tree>> {
        let _permit = self.context.acquire_fetch_permit().await?;
        tokio::select! {
            _ = self.context.cancellation_token().cancelled() => Err(DiffError::Cancelled),
            fetched = self.context.store().get_tree(id) => {
                fetched.map_err(|source| DiffError::Fetch { id: *id, source })
            }
        }
    }

    /// Walk two name-sorted entry lists in lockstep.
    fn merge(
        &self,
        prefix: &str,
        old: &[TreeEntry],
        new: &[TreeEntry],
        pending: &mut Vec<Subtree>,
    ) {
        let (mut i, mut j) = (0, 0);
        loop {
            match (old.get(i), new.get(j)) {
                (Some(o), Some(n)) => match o.name.as_bytes().cmp(n.name.as_bytes()) {
                    Ordering::Less => {
                        self.one_sided(Side::Old, join_path(prefix, &o.name), o, pending);
                        i += 1;
                    }
                    Ordering::Greater => {
                        self.one_sided(Side::New, join_path(prefix, &n.name), n, pending);
                        j += 1;
                    }
                    Ordering::Equal => {
                        self.both_sides(prefix, o, n, pending);
                        i += 1;
                        j += 1;
                    }
                },
                (Some(o), None) => {
                    self.one_sided(Side::Old, join_path(prefix, &o.name), o, pending);
                    i += 1;
                }
                (None, Some(n)) => {
                    self.one_sided(Side::New, join_path(prefix, &n.name), n, pending);
                    j += 1;
                }
                (None, None) => break,
            }
        }
    }

    /// An entry present on one side only: removed (old) or added (new).
    fn one_sided(
        &self,
        side: Side,
        path: String,
        entry: &TreeEntry,
        pending: &mut Vec<Subtree>,
    ) {
        let config = self.context.config();
        let walk = entry.is_tree() && config.directory_report == DirectoryReport::PerFile;

        let suppressed = match self.context.should_include(&path, entry.kind) {
            IgnoreDecision::Include => false,
            // A walked directory has no event of its own to suppress.
            IgnoreDecision::ExcludeFile => !walk,
            IgnoreDecision::ExcludeDirectory => true,
        };
        if suppressed {
            if side == Side::New && config.list_ignored {
                self.context.callback().ignored(&path, entry.kind);
            }
            return;
        }

        if walk {
            let (old, new) = match side {
                Side::Old => (TreeSource::Id(entry.id), TreeSource::Empty),
                Side::New => (TreeSource::Empty, TreeSource::Id(entry.id)),
            };
            self.queue(pending, path, old, new);
            return;
        }

        let callback = self.context.callback();
        match side {
            Side::Old => callback.removed(&path, entry.kind),
            Side::New => callback.added(&path, entry.kind),
        }
    }

    /// An entry present on both sides under the same name.
    fn both_sides(
        &self,
        prefix: &str,
        old: &TreeEntry,
        new: &TreeEntry,
        pending: &mut Vec<Subtree>,
    ) {
        if old.kind == new.kind && old.id == new.id {
            return;
        }
        let path = join_path(prefix, &new.name);

        if old.kind == new.kind && old.is_tree() {
            if self.context.should_include(&path, FileType::Directory)
                != IgnoreDecision::ExcludeDirectory
            {
                self.queue(pending, path, TreeSource::Id(old.id), TreeSource::Id(new.id));
            }
            return;
        }

        let mode_flip = old.kind.is_regular_or_executable() && new.kind.is_regular_or_executable();
        if old.kind == new.kind || mode_flip {
            if old.id == new.id && !self.context.config().report_mode_changes {
                return;
            }
            if self.context.should_include(&path, new.kind) == IgnoreDecision::Include {
                self.context.callback().modified(&path, old.kind, new.kind);
            }
            return;
        }

        // Type change: the old entry goes away and the new one appears.
        self.one_sided(Side::Old, path.clone(), old, pending);
        self.one_sided(Side::New, path, new, pending);
    }

    fn queue(&self, pending: &mut Vec<Subtree>, path: String, old: TreeSource, new: TreeSource) {
        trace!(path = %path, old = %old, new = %new, "queueing subtree comparison");
        pending.push(Subtree { path, old, new });
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}/{name}")
    }
}
