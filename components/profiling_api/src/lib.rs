//! Public API for embedding the VM profiling session manager
//!
//! This module provides a simple, ergonomic surface for hosts: one
//! [`ProfilingSession`] bundles the CPU, heap snapshot, and allocation
//! sampling profilers over a shared engine handle, and re-exports the
//! types a host needs to consume their artifacts.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use profiling_api::{ProfilingSession, SimulatedEngine};
//!
//! let engine = Arc::new(SimulatedEngine::new());
//! let session = ProfilingSession::new(engine);
//!
//! session.cpu().start(Some("startup"), true).unwrap();
//! // ... workload runs ...
//! let profile = session.cpu().stop().unwrap();
//! assert_eq!(profile.title, "startup");
//!
//! let snapshot = session.heap().take_snapshot(Some("baseline")).unwrap();
//! let json = snapshot.export_json().unwrap();
//! assert!(json.starts_with("{\"snapshot\":"));
//!
//! session.teardown();
//! ```

#![warn(missing_docs)]

use std::sync::Arc;
use tracing::debug;

// Re-export the types hosts interact with
pub use engine_bridge::{
    EngineCapabilities, EngineValue, InstrumentationEngine, ObjectHandle, SimulatedEngine,
    MIN_ALLOCATION_SAMPLING_VERSION,
};
pub use profile_types::{
    AllocationProfileNode, ArtifactId, CallFrame, CpuCallNode, HeapGraph, HeapObjectId,
    HeapStatsEntry, ProfileSample, ProfilerError, Result, SamplingOptions, SnapshotDiff,
    SnapshotDiffEntry,
};
pub use profiler_sessions::{
    CpuProfile, CpuProfiler, HeapProfiler, HeapSnapshot, SamplingHeapProfile, SamplingHeapProfiler,
};
pub use snapshot_serializer::{ProfileStream, SnapshotStream};

/// One profiling session over a hosting engine.
///
/// The three profiler kinds are independent and may be active
/// concurrently; each enforces its own single-writer state machine.
pub struct ProfilingSession {
    cpu: CpuProfiler,
    heap: HeapProfiler,
    allocation: SamplingHeapProfiler,
}

impl ProfilingSession {
    /// Create a session over the given engine. Engine capabilities are
    /// queried once here and cached for the session's lifetime.
    pub fn new(engine: Arc<dyn InstrumentationEngine>) -> Self {
        Self {
            cpu: CpuProfiler::new(Arc::clone(&engine)),
            heap: HeapProfiler::new(Arc::clone(&engine)),
            allocation: SamplingHeapProfiler::new(engine),
        }
    }

    /// The CPU profiler and its profile cache
    pub fn cpu(&self) -> &CpuProfiler {
        &self.cpu
    }

    /// The heap snapshot profiler and its snapshot cache
    pub fn heap(&self) -> &HeapProfiler {
        &self.heap
    }

    /// The allocation sampling profiler
    pub fn allocation_sampling(&self) -> &SamplingHeapProfiler {
        &self.allocation
    }

    /// Release every cached artifact of both caches. Idempotent; returns
    /// how many artifacts were released.
    pub fn teardown(&self) -> usize {
        let released = self.cpu.delete_all_profiles() + self.heap.delete_all_snapshots();
        debug!("profiling session teardown released {} artifacts", released);
        released
    }
}
