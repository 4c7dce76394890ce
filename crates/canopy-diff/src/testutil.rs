//! Shared fixtures for the engine's unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use canopy_store::{
    Commit, FileType, InMemoryObjectStore, ObjectStore, StoreError, StoreResult, Tree, TreeEntry,
};
use canopy_types::ObjectId;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

pub(crate) fn file(name: &str, id: ObjectId) -> TreeEntry {
    TreeEntry::new(name, id, FileType::Regular)
}

pub(crate) fn exec(name: &str, id: ObjectId) -> TreeEntry {
    TreeEntry::new(name, id, FileType::Executable)
}

pub(crate) fn dir(name: &str, id: ObjectId) -> TreeEntry {
    TreeEntry::new(name, id, FileType::Directory)
}

/// An in-memory store plus helpers for building trees in it.
pub(crate) struct Fixture {
    pub store: Arc<InMemoryObjectStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryObjectStore::new()),
        }
    }

    pub fn blob(&self, content: &str) -> ObjectId {
        self.store.write_blob(content.as_bytes().to_vec()).unwrap()
    }

    pub fn tree(&self, entries: Vec<TreeEntry>) -> ObjectId {
        self.store.write_tree(&Tree::new(entries)).unwrap()
    }

    /// A flat tree of `count` regular files named `{prefix}{i}`.
    pub fn wide_tree(&self, prefix: &str, count: usize) -> ObjectId {
        let entries = (0..count)
            .map(|i| file(&format!("{prefix}{i:04}"), self.blob(&format!("{prefix}-{i}"))))
            .collect();
        self.tree(entries)
    }

    pub fn commit(&self, root_tree: ObjectId) -> ObjectId {
        self.store.write_commit(&Commit::new(root_tree)).unwrap()
    }
}

/// Store wrapper that can fail chosen ids, slow every tree fetch down, and
/// records how many fetches overlapped and how many runtime tasks were alive
/// while fetching.
pub(crate) struct FaultyStore {
    inner: Arc<InMemoryObjectStore>,
    failing: Mutex<HashSet<ObjectId>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    peak_tasks: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryObjectStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            delay: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            peak_tasks: AtomicUsize::new(0),
        }
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(ms));
        self
    }

    /// Make every fetch of `id` fail with an I/O error.
    pub fn fail(&self, id: ObjectId) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn peak_alive_tasks(&self) -> usize {
        self.peak_tasks.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn get_tree(&self, id: &ObjectId) -> StoreResult<Arc<Tree>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);
        let alive = tokio::runtime::Handle::current().metrics().num_alive_tasks();
        self.peak_tasks.fetch_max(alive, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(id) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        self.inner.get_tree(id).await
    }

    async fn get_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        if self.failing.lock().unwrap().contains(id) {
            return Err(StoreError::NotFound(*id));
        }
        self.inner.get_commit(id).await
    }
}
