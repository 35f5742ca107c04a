// Profiling artifact types, identifiers, and error definitions
//
// This module is part of the CortenBrowser VM profiling implementation.

pub mod cpu;
pub mod errors;
pub mod heap;
pub mod sampling;

// Re-export commonly used types
pub use cpu::{CallFrame, CpuCallNode, ProfileSample, RawCpuCapture, RawProfileNode};
pub use errors::{ProfilerError, Result};
pub use heap::{
    HeapEdge, HeapEdgeType, HeapGraph, HeapNode, HeapNodeType, HeapObjectId, HeapSampleMarker,
    HeapStatsEntry, SnapshotDiff, SnapshotDiffEntry,
};
pub use sampling::{AllocationProfileNode, SamplingOptions};

/// Identifier assigned to a cached artifact. Monotonically increasing per
/// artifact kind and never reused within a process lifetime.
pub type ArtifactId = u64;
