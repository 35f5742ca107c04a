//! Allocation-sampling state machine
//!
//! Requires allocation-sampling instrumentation in the hosting engine;
//! support is queried once at construction and cached. Results are not
//! cached in an artifact cache: each stop supersedes the previous one.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use engine_bridge::{InstrumentationEngine, MIN_ALLOCATION_SAMPLING_VERSION};
use profile_types::{AllocationProfileNode, ProfilerError, Result, SamplingOptions};
use snapshot_serializer::ProfileStream;

/// Sampling state of the allocation profiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SamplingState {
    Idle,
    Sampling,
}

/// A finalized allocation sample tree
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingHeapProfile {
    /// Root of the sample tree; every node carries its call frame fields,
    /// self-allocated size, and ordered children
    pub head: AllocationProfileNode,
}

impl SamplingHeapProfile {
    /// Complete JSON document for this profile
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }

    /// Readable byte stream over the JSON document
    pub fn export_stream(&self) -> Result<ProfileStream> {
        Ok(ProfileStream::new(self.export_json()?))
    }
}

/// Single-writer allocation sampling controller
pub struct SamplingHeapProfiler {
    engine: Arc<dyn InstrumentationEngine>,
    supported: bool,
    state: RwLock<SamplingState>,
}

impl SamplingHeapProfiler {
    /// Create a profiler over the given engine, querying allocation
    /// sampling support once
    pub fn new(engine: Arc<dyn InstrumentationEngine>) -> Self {
        let supported = engine.capabilities().allocation_sampling;
        if !supported {
            warn!(
                "engine {} lacks allocation sampling instrumentation",
                engine.capabilities().engine_version
            );
        }
        Self {
            engine,
            supported,
            state: RwLock::new(SamplingState::Idle),
        }
    }

    fn ensure_supported(&self) -> Result<()> {
        if self.supported {
            Ok(())
        } else {
            Err(ProfilerError::capability_unsupported(
                "allocation sampling",
                MIN_ALLOCATION_SAMPLING_VERSION,
            ))
        }
    }

    /// Whether sampling is currently in flight
    pub fn is_sampling(&self) -> bool {
        *self.state.read() == SamplingState::Sampling
    }

    /// Begin interval-based allocation sampling
    pub fn start(&self, options: Option<SamplingOptions>) -> Result<()> {
        self.ensure_supported()?;
        let mut state = self.state.write();
        if *state == SamplingState::Sampling {
            warn!("allocation sampling rejected: already in flight");
            return Err(ProfilerError::invalid_state(
                "allocation sampling is already in flight",
            ));
        }
        let options = options.unwrap_or_default();
        self.engine.begin_allocation_sampling(&options)?;
        *state = SamplingState::Sampling;
        debug!(
            "allocation sampling started (interval {} bytes, depth {})",
            options.sample_interval, options.stack_depth
        );
        Ok(())
    }

    /// End sampling and return the sample tree. The result is not cached;
    /// the next start/stop cycle supersedes it.
    pub fn stop(&self) -> Result<SamplingHeapProfile> {
        self.ensure_supported()?;
        let mut state = self.state.write();
        if *state == SamplingState::Idle {
            warn!("allocation sampling stop rejected: not active");
            return Err(ProfilerError::invalid_state(
                "allocation sampling is not active",
            ));
        }
        let head = self.engine.end_allocation_sampling()?;
        *state = SamplingState::Idle;
        debug!("allocation sampling finalized");
        Ok(SamplingHeapProfile { head })
    }
}
