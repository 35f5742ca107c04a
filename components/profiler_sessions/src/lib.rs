//! Profiling session state machines and artifact caches
//!
//! This module provides the three profiler kinds over one engine handle:
//!
//! - **CpuProfiler**: single-writer CPU capture control owning the CPU
//!   profile cache
//! - **HeapProfiler**: synchronous heap snapshots, live object-id
//!   tracking, and incremental heap-stats delivery, owning the snapshot
//!   cache
//! - **SamplingHeapProfiler**: capability-gated allocation sampling with
//!   single most-recent-result semantics
//!
//! Artifacts are immutable once finalized; deleting a cache entry is the
//! only way their memory is released.

mod cache;
mod cpu_profiler;
mod diff;
mod heap_profiler;
mod sampling_profiler;

pub use cache::ArtifactCache;
pub use cpu_profiler::{CpuProfile, CpuProfiler, DEFAULT_SAMPLING_INTERVAL_US};
pub use heap_profiler::{HeapProfiler, HeapSnapshot};
pub use sampling_profiler::{SamplingHeapProfile, SamplingHeapProfiler};
