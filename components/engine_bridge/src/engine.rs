//! The instrumentation surface consumed from the hosting engine
//!
//! All operations are synchronous; each either completes or fails at the
//! call site. Instrumentation that the engine version does not carry must
//! surface as `ProfilerError::CapabilityUnsupported`, never a panic.

use profile_types::{
    AllocationProfileNode, HeapGraph, HeapObjectId, HeapStatsEntry, RawCpuCapture, Result,
    SamplingOptions,
};

use crate::capabilities::EngineCapabilities;

/// Engine-internal handle for an object slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u64);

/// A live value handle passed across the engine boundary
#[derive(Debug, Clone, PartialEq)]
pub enum EngineValue {
    /// The `undefined` value
    Undefined,
    /// The `null` value
    Null,
    /// A boolean scalar
    Bool(bool),
    /// A numeric scalar
    Number(f64),
    /// A string scalar
    Str(String),
    /// A heap object
    Object(ObjectHandle),
}

/// Instrumentation operations the profilers mediate.
///
/// Implemented by the hosting VM integration; [`crate::SimulatedEngine`]
/// provides an in-memory implementation for tests.
pub trait InstrumentationEngine: Send + Sync {
    /// Report the engine's instrumentation feature set. Queried once per
    /// profiler at construction time.
    fn capabilities(&self) -> EngineCapabilities;

    /// Begin accumulating CPU call-tree samples. At most one CPU capture
    /// may be in flight process-wide.
    fn begin_cpu_capture(&self, record_samples: bool) -> Result<()>;

    /// End the in-flight CPU capture and hand back the accumulated data
    fn end_cpu_capture(&self) -> Result<RawCpuCapture>;

    /// Change the CPU sampling interval. Only legal while no capture is in
    /// flight.
    fn set_sampling_interval(&self, interval_us: u32) -> Result<()>;

    /// Walk the full live object graph and return it frozen. Blocking and
    /// stop-the-world from the caller's perspective.
    fn capture_heap_graph(&self) -> Result<HeapGraph>;

    /// Begin recording allocation/deallocation deltas
    fn begin_heap_object_tracking(&self);

    /// Stop recording allocation/deallocation deltas
    fn end_heap_object_tracking(&self);

    /// Drain buffered allocation-delta batches in recording order
    fn drain_allocation_deltas(&self) -> Vec<Vec<HeapStatsEntry>>;

    /// Highest heap object id assigned so far
    fn last_assigned_object_id(&self) -> HeapObjectId;

    /// Resolve a value to its stable heap object id. `undefined` owns a
    /// reserved id; scalars and collected objects have none.
    fn resolve_object_id(&self, value: &EngineValue) -> Option<HeapObjectId>;

    /// Resolve a heap object id back to a live value, when one still exists
    fn resolve_id_to_object(&self, id: HeapObjectId) -> Option<EngineValue>;

    /// Begin interval-based allocation sampling
    fn begin_allocation_sampling(&self, options: &SamplingOptions) -> Result<()>;

    /// End allocation sampling and hand back the sample tree root
    fn end_allocation_sampling(&self) -> Result<AllocationProfileNode>;
}
