//! Identifier-keyed artifact storage shared by the profiler kinds

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use profile_types::ArtifactId;

/// Cache of finalized artifacts keyed by monotonically assigned ids.
///
/// Ids start at 1 and are never reused within a process lifetime. The
/// cache is mutated only by a successful stop/take call (insert) and by
/// explicit deletion (remove); removing an entry drops the last owning
/// reference the profiler holds.
#[derive(Debug)]
pub struct ArtifactCache<T> {
    entries: RwLock<HashMap<ArtifactId, Arc<T>>>,
    next_id: AtomicU64,
    kind: &'static str,
}

impl<T> ArtifactCache<T> {
    /// Create an empty cache. `kind` names the artifact kind in logs.
    pub fn new(kind: &'static str) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            kind,
        }
    }

    /// Reserve the next identifier for this kind
    pub fn next_id(&self) -> ArtifactId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Insert a finalized artifact under its reserved id
    pub fn insert(&self, id: ArtifactId, artifact: Arc<T>) {
        debug!("caching {} {}", self.kind, id);
        self.entries.write().insert(id, artifact);
    }

    /// Look up an artifact by id
    pub fn get(&self, id: ArtifactId) -> Option<Arc<T>> {
        self.entries.read().get(&id).cloned()
    }

    /// All cached artifacts, ordered by id
    pub fn list(&self) -> Vec<Arc<T>> {
        let entries = self.entries.read();
        let mut pairs: Vec<(&ArtifactId, &Arc<T>)> = entries.iter().collect();
        pairs.sort_by_key(|(id, _)| **id);
        pairs.into_iter().map(|(_, artifact)| Arc::clone(artifact)).collect()
    }

    /// Remove one artifact, releasing its backing memory. Unknown ids are
    /// a no-op so teardown stays idempotent.
    pub fn remove(&self, id: ArtifactId) -> bool {
        let removed = self.entries.write().remove(&id).is_some();
        if removed {
            debug!("released {} {}", self.kind, id);
        }
        removed
    }

    /// Remove every cached artifact, returning how many were released
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let released = entries.len();
        entries.clear();
        if released > 0 {
            debug!("released {} cached {} artifacts", released, self.kind);
        }
        released
    }

    /// Number of cached artifacts
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no artifacts
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
