//! Heap snapshot capture, live object-id tracking, and heap-stats draining

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use engine_bridge::{EngineValue, InstrumentationEngine};
use profile_types::{
    ArtifactId, HeapGraph, HeapObjectId, HeapStatsEntry, ProfilerError, Result, SnapshotDiff,
};
use snapshot_serializer::{serialize_graph_incremental, serialize_graph_to_string, SnapshotStream};

use crate::cache::ArtifactCache;
use crate::diff::diff_graphs;

/// A finalized heap object graph. Frozen at capture time; released by
/// deleting it from the owning profiler's cache.
#[derive(Debug)]
pub struct HeapSnapshot {
    /// Cache identifier
    pub id: ArtifactId,
    /// Title passed at capture time (empty when omitted)
    pub title: String,
    graph: Arc<HeapGraph>,
}

impl HeapSnapshot {
    /// The underlying frozen graph
    pub fn graph(&self) -> &HeapGraph {
        &self.graph
    }

    /// Number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.graph.nodes.len()
    }

    /// Number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.graph.edges.len()
    }

    /// Largest heap object id present in the node table
    pub fn max_heap_object_id(&self) -> HeapObjectId {
        self.graph.max_heap_object_id()
    }

    /// Serialize incrementally: `on_chunk` receives document fragments in
    /// order, then `on_done` fires exactly once. On failure the error is
    /// returned without the done signal.
    pub fn serialize<C, D>(&self, on_chunk: C, on_done: D) -> Result<()>
    where
        C: FnMut(&str),
        D: FnOnce(),
    {
        serialize_graph_incremental(&self.graph, on_chunk, on_done)
    }

    /// Complete JSON document for this snapshot
    pub fn export_json(&self) -> Result<String> {
        serialize_graph_to_string(&self.graph)
    }

    /// Readable byte stream over the JSON document, produced chunk by
    /// chunk as the consumer pulls
    pub fn export_stream(&self) -> Result<SnapshotStream> {
        SnapshotStream::new(Arc::clone(&self.graph))
    }

    /// Structural diff against another snapshot: nodes that appeared,
    /// disappeared, and the per-type size movement. Total for any two
    /// finalized snapshots, including self-comparison.
    pub fn compare(&self, other: &HeapSnapshot) -> SnapshotDiff {
        diff_graphs(&self.graph, &other.graph)
    }
}

/// Heap snapshot controller owning the snapshot cache. Snapshot capture
/// is synchronous and blocking, so no two captures can overlap.
pub struct HeapProfiler {
    engine: Arc<dyn InstrumentationEngine>,
    snapshots: ArtifactCache<HeapSnapshot>,
    tracking_active: AtomicBool,
}

impl HeapProfiler {
    /// Create a profiler over the given engine
    pub fn new(engine: Arc<dyn InstrumentationEngine>) -> Self {
        Self {
            engine,
            snapshots: ArtifactCache::new("heap snapshot"),
            tracking_active: AtomicBool::new(false),
        }
    }

    /// Walk the full live object graph and cache the frozen result
    pub fn take_snapshot(&self, title: Option<&str>) -> Result<Arc<HeapSnapshot>> {
        let graph = self.engine.capture_heap_graph()?;
        let id = self.snapshots.next_id();
        debug!(
            "heap snapshot {} captured: {} nodes, {} edges",
            id,
            graph.nodes.len(),
            graph.edges.len()
        );
        let snapshot = Arc::new(HeapSnapshot {
            id,
            title: title.unwrap_or_default().to_string(),
            graph: Arc::new(graph),
        });
        self.snapshots.insert(id, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Whether heap object tracking is active
    pub fn is_tracking(&self) -> bool {
        self.tracking_active.load(Ordering::SeqCst)
    }

    /// Begin recording allocation/deallocation deltas, independent of any
    /// snapshot
    pub fn start_tracking_heap_objects(&self) -> Result<()> {
        if self.tracking_active.swap(true, Ordering::SeqCst) {
            warn!("heap object tracking already active");
            return Err(ProfilerError::invalid_state(
                "heap object tracking is already active",
            ));
        }
        self.engine.begin_heap_object_tracking();
        debug!("heap object tracking started");
        Ok(())
    }

    /// Stop recording allocation/deallocation deltas
    pub fn stop_tracking_heap_objects(&self) -> Result<()> {
        if !self.tracking_active.swap(false, Ordering::SeqCst) {
            warn!("heap object tracking not active");
            return Err(ProfilerError::invalid_state(
                "heap object tracking is not active",
            ));
        }
        self.engine.end_heap_object_tracking();
        debug!("heap object tracking stopped");
        Ok(())
    }

    /// Drain buffered allocation-delta samples. `on_sample` receives
    /// ordered batches zero or more times, then `on_done` fires exactly
    /// once. Returns the object-id high-water mark at the moment of the
    /// call, not after draining.
    pub fn get_heap_stats<S, D>(&self, mut on_sample: S, on_done: D) -> HeapObjectId
    where
        S: FnMut(&[HeapStatsEntry]),
        D: FnOnce(),
    {
        let last_seen = self.engine.last_assigned_object_id();
        for batch in self.engine.drain_allocation_deltas() {
            on_sample(&batch);
        }
        on_done();
        last_seen
    }

    /// Stable heap object id for a value. `None` input (no argument) and
    /// scalar values have no id; `undefined` owns a reserved one.
    pub fn heap_object_id(&self, value: Option<&EngineValue>) -> Option<HeapObjectId> {
        value.and_then(|value| self.engine.resolve_object_id(value))
    }

    /// Resolve a heap object id back to a live value, when one still
    /// exists and is reachable
    pub fn object_by_heap_object_id(&self, id: HeapObjectId) -> Option<EngineValue> {
        self.engine.resolve_id_to_object(id)
    }

    /// All cached snapshots, ordered by id
    pub fn snapshots(&self) -> Vec<Arc<HeapSnapshot>> {
        self.snapshots.list()
    }

    /// Look up a cached snapshot
    pub fn snapshot(&self, id: ArtifactId) -> Option<Arc<HeapSnapshot>> {
        self.snapshots.get(id)
    }

    /// Delete one cached snapshot, releasing the graph memory. Unknown
    /// ids are a no-op.
    pub fn delete_snapshot(&self, id: ArtifactId) -> bool {
        self.snapshots.remove(id)
    }

    /// Delete every cached snapshot, returning how many were released
    pub fn delete_all_snapshots(&self) -> usize {
        self.snapshots.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_bridge::SimulatedEngine;

    fn profiler_with_engine() -> (HeapProfiler, Arc<SimulatedEngine>) {
        let engine = Arc::new(SimulatedEngine::new());
        (HeapProfiler::new(engine.clone()), engine)
    }

    #[test]
    fn test_take_snapshot_caches_artifact() {
        let (profiler, _engine) = profiler_with_engine();
        let snapshot = profiler.take_snapshot(Some("baseline")).unwrap();
        assert_eq!(snapshot.title, "baseline");
        assert!(snapshot.node_count() > 0);
        assert_eq!(profiler.snapshots().len(), 1);
        assert!(profiler.snapshot(snapshot.id).is_some());
    }

    #[test]
    fn test_delete_snapshot_resolves_not_found() {
        let (profiler, _engine) = profiler_with_engine();
        let snapshot = profiler.take_snapshot(None).unwrap();
        assert!(profiler.delete_snapshot(snapshot.id));
        assert!(profiler.snapshot(snapshot.id).is_none());
        assert!(!profiler.delete_snapshot(snapshot.id));
    }

    #[test]
    fn test_tracking_brackets() {
        let (profiler, _engine) = profiler_with_engine();
        assert!(profiler.stop_tracking_heap_objects().is_err());

        profiler.start_tracking_heap_objects().unwrap();
        assert!(profiler.is_tracking());
        assert!(profiler.start_tracking_heap_objects().is_err());

        profiler.stop_tracking_heap_objects().unwrap();
        assert!(!profiler.is_tracking());
    }

    #[test]
    fn test_heap_stats_drains_then_signals_done() {
        let (profiler, engine) = profiler_with_engine();
        profiler.start_tracking_heap_objects().unwrap();
        engine.allocate_object("tracked", 256);
        engine.allocate_object("tracked2", 512);

        let mut batches = 0;
        let mut entries = 0;
        let mut done = 0;
        let last_seen = profiler.get_heap_stats(
            |batch| {
                batches += 1;
                entries += batch.len();
            },
            || done += 1,
        );
        assert!(batches >= 1);
        assert_eq!(entries, 2);
        assert_eq!(done, 1);
        assert!(last_seen.0 >= HeapObjectId::UNDEFINED.0);

        profiler.stop_tracking_heap_objects().unwrap();
    }

    #[test]
    fn test_object_id_resolution() {
        let (profiler, engine) = profiler_with_engine();

        // undefined owns a reserved id; missing input resolves to nothing
        assert_eq!(
            profiler.heap_object_id(Some(&EngineValue::Undefined)),
            Some(HeapObjectId::UNDEFINED)
        );
        assert!(profiler.heap_object_id(None).is_none());
        assert!(profiler
            .heap_object_id(Some(&EngineValue::Number(5.0)))
            .is_none());

        let value = engine.allocate_object("widget", 64);
        let id = profiler.heap_object_id(Some(&value)).unwrap();
        assert_eq!(profiler.object_by_heap_object_id(id), Some(value.clone()));

        engine.collect_object(&value);
        assert!(profiler.object_by_heap_object_id(id).is_none());
    }

    #[test]
    fn test_compare_self_is_empty() {
        let (profiler, _engine) = profiler_with_engine();
        let snapshot = profiler.take_snapshot(None).unwrap();
        let diff = snapshot.compare(&snapshot);
        assert_eq!(diff.nodes_added, 0);
        assert_eq!(diff.nodes_removed, 0);
    }

    #[test]
    fn test_compare_detects_growth() {
        let (profiler, engine) = profiler_with_engine();
        let before = profiler.take_snapshot(Some("before")).unwrap();
        engine.allocate_object("leaked", 4096);
        let after = profiler.take_snapshot(Some("after")).unwrap();

        let diff = before.compare(&after);
        assert_eq!(diff.nodes_added, 1);
        assert_eq!(diff.size_added, 4096);
    }

    #[test]
    fn test_serialize_chunks_concatenate_to_export_json() {
        let (profiler, _engine) = profiler_with_engine();
        let snapshot = profiler.take_snapshot(None).unwrap();

        let mut concatenated = String::new();
        let mut done = 0;
        snapshot
            .serialize(|chunk| concatenated.push_str(chunk), || done += 1)
            .unwrap();
        assert_eq!(done, 1);
        assert_eq!(concatenated, snapshot.export_json().unwrap());
    }
}
