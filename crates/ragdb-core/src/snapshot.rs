//! Copy-on-write index versioning.
//!
//! Readers obtain one immutable [`IndexSnapshot`] reference at the start of
//! a pipeline execution and use it throughout; writers build a replacement
//! off to the side and publish it atomically. In-flight executions finish
//! against the snapshot they pinned.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::traits::{ChunkStore, DenseRetriever, SparseRetriever};

/// One immutable generation of the sparse/dense indices and chunk store.
pub struct IndexSnapshot {
    pub generation: u64,
    pub published_at: DateTime<Utc>,
    pub sparse: Arc<dyn SparseRetriever>,
    pub dense: Arc<dyn DenseRetriever>,
    pub store: Arc<dyn ChunkStore>,
}

impl IndexSnapshot {
    pub fn new(
        sparse: Arc<dyn SparseRetriever>,
        dense: Arc<dyn DenseRetriever>,
        store: Arc<dyn ChunkStore>,
    ) -> Self {
        Self { generation: 0, published_at: Utc::now(), sparse, dense, store }
    }
}

/// Owns the current snapshot pointer. Reads never block other reads;
/// publishing swaps the pointer under a short write lock.
pub struct IndexManager {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl IndexManager {
    pub fn new(initial: IndexSnapshot) -> Self {
        Self { current: RwLock::new(Arc::new(initial)) }
    }

    /// Pins the current generation for the duration of one execution.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            // A poisoned lock still holds a valid pointer; readers proceed.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Publishes a freshly built snapshot. The generation counter advances
    /// monotonically regardless of what the builder put in it.
    pub fn publish(&self, mut snapshot: IndexSnapshot) {
        match self.current.write() {
            Ok(mut guard) => {
                snapshot.generation = guard.generation + 1;
                snapshot.published_at = Utc::now();
                *guard = Arc::new(snapshot);
            }
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                snapshot.generation = guard.generation + 1;
                snapshot.published_at = Utc::now();
                *guard = Arc::new(snapshot);
            }
        }
    }
}
