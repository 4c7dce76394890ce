//! Status report types and the aggregator that builds them.
//!
//! [`StatusAggregator`] implements [`DiffCallback`] by folding every event
//! into an [`ScmStatus`]: a path → [`ScmFileStatus`] map plus a path → error
//! message map for subtrees that could not be compared.

use std::collections::BTreeMap;
use std::sync::Mutex;

use bitflags::bitflags;
use canopy_store::FileType;
use serde::{Deserialize, Serialize};

use crate::context::DiffCallback;
use crate::error::DiffError;

/// The three outcomes reportable for a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

bitflags! {
    /// Status of one path in an [`ScmStatus`].
    ///
    /// A flag set rather than a single value: a type change (file replaced
    /// by a directory, say) is recorded as `ADDED | REMOVED` on one path.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ScmFileStatus: u8 {
        const ADDED = 1;
        const REMOVED = 1 << 1;
        const MODIFIED = 1 << 2;
        const IGNORED = 1 << 3;
    }
}

impl From<ChangeKind> for ScmFileStatus {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Added => Self::ADDED,
            ChangeKind::Removed => Self::REMOVED,
            ChangeKind::Modified => Self::MODIFIED,
        }
    }
}

/// Per-path change report for a diff.
///
/// Paths are `/`-separated and relative to the diff root. A non-empty
/// `errors` map means the report is best effort for those subtrees, not that
/// the diff failed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmStatus {
    pub entries: BTreeMap<String, ScmFileStatus>,
    pub errors: BTreeMap<String, String>,
}

impl ScmStatus {
    /// An empty, clean status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing changed and nothing failed.
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty() && self.errors.is_empty()
    }

    /// Returns `true` if some subtree could not be compared.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of paths with a recorded status.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no path has a recorded status.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Status recorded for `path`, if any.
    pub fn get(&self, path: &str) -> Option<ScmFileStatus> {
        self.entries.get(path).copied()
    }

    /// Paths whose status includes all of `flags`, in path order.
    pub fn paths_with(&self, flags: ScmFileStatus) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(move |(_, status)| status.contains(flags))
            .map(|(path, _)| path.as_str())
    }

    fn record(&mut self, path: &str, flags: ScmFileStatus) {
        *self
            .entries
            .entry(path.to_owned())
            .or_insert(ScmFileStatus::empty()) |= flags;
    }

    fn record_error(&mut self, path: &str, message: String) {
        self.errors.entry(path.to_owned()).or_insert(message);
    }
}

/// [`DiffCallback`] that collects events into an [`ScmStatus`].
///
/// Safe to share across the comparator's concurrent subtree tasks.
#[derive(Debug, Default)]
pub struct StatusAggregator {
    status: Mutex<ScmStatus>,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the collected status, leaving an empty one behind.
    ///
    /// Only meaningful once the diff feeding this aggregator has finished.
    pub fn take_status(&self) -> ScmStatus {
        std::mem::take(&mut *self.status.lock().expect("lock poisoned"))
    }

    fn record(&self, path: &str, kind: ChangeKind) {
        self.status
            .lock()
            .expect("lock poisoned")
            .record(path, kind.into());
    }
}

impl DiffCallback for StatusAggregator {
    fn added(&self, path: &str, _kind: FileType) {
        self.record(path, ChangeKind::Added);
    }

    fn removed(&self, path: &str, _kind: FileType) {
        self.record(path, ChangeKind::Removed);
    }

    fn modified(&self, path: &str, _old: FileType, _new: FileType) {
        self.record(path, ChangeKind::Modified);
    }

    fn ignored(&self, path: &str, _kind: FileType) {
        self.status
            .lock()
            .expect("lock poisoned")
            .record(path, ScmFileStatus::IGNORED);
    }

    fn error(&self, path: &str, error: &DiffError) {
        self.status
            .lock()
            .expect("lock poisoned")
            .record_error(path, error.to_string());
    }
}
