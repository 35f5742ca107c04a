//! Lifecycle tests across the profiler kinds
//!
//! These tests verify the cache accounting and state machine guarantees
//! that hold over whole start/stop sequences.

use std::sync::Arc;

use engine_bridge::SimulatedEngine;
use profiler_sessions::{CpuProfiler, HeapProfiler, SamplingHeapProfiler};

#[test]
fn test_cache_size_tracks_stops_minus_deletions() {
    let engine = Arc::new(SimulatedEngine::new());
    let profiler = CpuProfiler::new(engine);

    let mut ids = Vec::new();
    for cycle in 0..5 {
        profiler.start(Some(&format!("capture-{cycle}")), false).unwrap();
        ids.push(profiler.stop().unwrap().id);
    }
    assert_eq!(profiler.profiles().len(), 5);

    assert!(profiler.delete_profile(ids[0]));
    assert!(profiler.delete_profile(ids[3]));
    assert_eq!(profiler.profiles().len(), 3);

    // Remaining profiles keep their titles and ids
    let remaining: Vec<u64> = profiler.profiles().iter().map(|p| p.id).collect();
    assert_eq!(remaining, vec![ids[1], ids[2], ids[4]]);
}

#[test]
fn test_delete_all_resolves_every_id_to_not_found() {
    let engine = Arc::new(SimulatedEngine::new());
    let profiler = HeapProfiler::new(engine);

    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(profiler.take_snapshot(None).unwrap().id);
    }

    assert_eq!(profiler.delete_all_snapshots(), 4);
    assert_eq!(profiler.snapshots().len(), 0);
    for id in ids {
        assert!(profiler.snapshot(id).is_none());
        // Deleting again stays a no-op
        assert!(!profiler.delete_snapshot(id));
    }
}

#[test]
fn test_titles_survive_finalization_exactly() {
    let engine = Arc::new(SimulatedEngine::new());
    let profiler = CpuProfiler::new(engine);

    for title in ["", "boot", "page load (2)", "ünïcode"] {
        profiler.start(Some(title), false).unwrap();
        let profile = profiler.stop().unwrap();
        assert_eq!(profile.title, title);
    }
}

#[test]
fn test_profiler_kinds_are_independent() {
    let engine = Arc::new(SimulatedEngine::new());
    let cpu = CpuProfiler::new(engine.clone());
    let heap = HeapProfiler::new(engine.clone());
    let sampling = SamplingHeapProfiler::new(engine);

    cpu.start(None, false).unwrap();
    heap.start_tracking_heap_objects().unwrap();
    sampling.start(None).unwrap();

    // A snapshot can be taken while all three are active
    let snapshot = heap.take_snapshot(Some("mid-flight")).unwrap();
    assert!(snapshot.node_count() > 0);

    sampling.stop().unwrap();
    heap.stop_tracking_heap_objects().unwrap();
    cpu.stop().unwrap();
}

#[test]
fn test_ids_never_reused_after_deletion() {
    let engine = Arc::new(SimulatedEngine::new());
    let profiler = CpuProfiler::new(engine);

    profiler.start(None, false).unwrap();
    let first = profiler.stop().unwrap().id;
    profiler.delete_all_profiles();

    profiler.start(None, false).unwrap();
    let second = profiler.stop().unwrap().id;
    assert!(second > first);
}
