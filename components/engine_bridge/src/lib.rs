//! Bridge to the hosting VM's instrumentation engine
//!
//! The profilers never talk to the VM directly; they consume the
//! [`InstrumentationEngine`] trait defined here. Engine capabilities are
//! queried once at profiler construction and cached for the process
//! lifetime. [`SimulatedEngine`] is a full in-memory implementation used
//! by tests and demos.

mod capabilities;
mod engine;
mod simulated;

pub use capabilities::{EngineCapabilities, MIN_ALLOCATION_SAMPLING_VERSION};
pub use engine::{EngineValue, InstrumentationEngine, ObjectHandle};
pub use simulated::SimulatedEngine;
