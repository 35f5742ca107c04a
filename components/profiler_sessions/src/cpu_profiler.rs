//! CPU capture state machine and finalized profile artifacts

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use engine_bridge::InstrumentationEngine;
use profile_types::{
    ArtifactId, CallFrame, CpuCallNode, ProfileSample, ProfilerError, RawCpuCapture,
    RawProfileNode, Result,
};
use snapshot_serializer::ProfileStream;

use crate::cache::ArtifactCache;

/// Sampling interval applied until the host changes it (microseconds)
pub const DEFAULT_SAMPLING_INTERVAL_US: u32 = 100;

/// Capture state of the CPU profiler
#[derive(Debug, Clone, PartialEq, Eq)]
enum CaptureState {
    Idle,
    Recording {
        title: String,
        record_samples: bool,
    },
}

/// A finalized CPU call-tree capture. Immutable after stop; released by
/// deleting it from the owning profiler's cache.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuProfile {
    /// Cache identifier
    pub id: ArtifactId,
    /// Title passed at start time (empty when omitted)
    pub title: String,
    /// Root of the call tree
    pub root: CpuCallNode,
    /// Raw sample timeline; present only when recording samples was
    /// requested at start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<ProfileSample>>,
    /// Capture start time (microseconds)
    pub start_time_us: f64,
    /// Capture end time (microseconds)
    pub end_time_us: f64,
}

impl CpuProfile {
    /// Complete JSON document for this profile
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }

    /// Readable byte stream over the JSON document
    pub fn export_stream(&self) -> Result<ProfileStream> {
        Ok(ProfileStream::new(self.export_json()?))
    }
}

/// Single-writer CPU capture controller owning the CPU profile cache.
/// At most one capture is in flight at a time.
pub struct CpuProfiler {
    engine: Arc<dyn InstrumentationEngine>,
    state: RwLock<CaptureState>,
    sampling_interval_us: AtomicU32,
    profiles: ArtifactCache<CpuProfile>,
}

impl CpuProfiler {
    /// Create a profiler over the given engine
    pub fn new(engine: Arc<dyn InstrumentationEngine>) -> Self {
        Self {
            engine,
            state: RwLock::new(CaptureState::Idle),
            sampling_interval_us: AtomicU32::new(DEFAULT_SAMPLING_INTERVAL_US),
            profiles: ArtifactCache::new("cpu profile"),
        }
    }

    /// Whether a capture is currently in flight
    pub fn is_recording(&self) -> bool {
        matches!(*self.state.read(), CaptureState::Recording { .. })
    }

    /// The sampling interval in microseconds
    pub fn sampling_interval(&self) -> u32 {
        self.sampling_interval_us.load(Ordering::SeqCst)
    }

    /// Change the sampling interval. Only legal while idle; rejected
    /// mid-capture with the active interval left unchanged.
    pub fn set_sampling_interval(&self, interval_us: u32) -> Result<()> {
        let state = self.state.read();
        if matches!(*state, CaptureState::Recording { .. }) {
            warn!("sampling interval change rejected while recording");
            return Err(ProfilerError::invalid_state(
                "sampling interval cannot change while a capture is recording",
            ));
        }
        self.engine.set_sampling_interval(interval_us)?;
        self.sampling_interval_us.store(interval_us, Ordering::SeqCst);
        debug!("cpu sampling interval set to {} microseconds", interval_us);
        Ok(())
    }

    /// Begin a capture. Fails without starting a second capture when one
    /// is already in flight.
    pub fn start(&self, title: Option<&str>, record_samples: bool) -> Result<()> {
        let mut state = self.state.write();
        if matches!(*state, CaptureState::Recording { .. }) {
            warn!("cpu capture rejected: another capture is in flight");
            return Err(ProfilerError::invalid_state(
                "a cpu capture is already in flight",
            ));
        }
        self.engine.begin_cpu_capture(record_samples)?;
        let title = title.unwrap_or_default().to_string();
        debug!("cpu capture started (title: {:?})", title);
        *state = CaptureState::Recording {
            title,
            record_samples,
        };
        Ok(())
    }

    /// End the in-flight capture, finalize it into a cached artifact, and
    /// return it
    pub fn stop(&self) -> Result<Arc<CpuProfile>> {
        let mut state = self.state.write();
        let (title, record_samples) = match &*state {
            CaptureState::Idle => {
                warn!("cpu stop rejected: no capture in flight");
                return Err(ProfilerError::invalid_state("no cpu capture is in flight"));
            }
            CaptureState::Recording {
                title,
                record_samples,
            } => (title.clone(), *record_samples),
        };
        let raw = self.engine.end_cpu_capture()?;
        *state = CaptureState::Idle;
        drop(state);

        let id = self.profiles.next_id();
        let profile = Arc::new(finalize_capture(id, title, raw, record_samples));
        self.profiles.insert(id, Arc::clone(&profile));
        debug!("cpu capture finalized as profile {}", id);
        Ok(profile)
    }

    /// All cached profiles, ordered by id
    pub fn profiles(&self) -> Vec<Arc<CpuProfile>> {
        self.profiles.list()
    }

    /// Look up a cached profile
    pub fn profile(&self, id: ArtifactId) -> Option<Arc<CpuProfile>> {
        self.profiles.get(id)
    }

    /// Delete one cached profile, releasing its memory. Unknown ids are a
    /// no-op.
    pub fn delete_profile(&self, id: ArtifactId) -> bool {
        self.profiles.remove(id)
    }

    /// Delete every cached profile, returning how many were released
    pub fn delete_all_profiles(&self) -> usize {
        self.profiles.clear()
    }
}

/// Fold the engine's flat capture into a timed call tree
fn finalize_capture(
    id: ArtifactId,
    title: String,
    raw: RawCpuCapture,
    record_samples: bool,
) -> CpuProfile {
    let interval_us = raw.sampling_interval_us as f64;
    let root = build_call_node(0, &raw.nodes, interval_us);
    CpuProfile {
        id,
        title,
        root,
        samples: if record_samples {
            Some(raw.samples)
        } else {
            None
        },
        start_time_us: raw.start_time_us,
        end_time_us: raw.end_time_us,
    }
}

fn build_call_node(index: u32, nodes: &[RawProfileNode], interval_us: f64) -> CpuCallNode {
    let Some(node) = nodes.get(index as usize) else {
        return CpuCallNode {
            call_frame: CallFrame::default(),
            hit_count: 0,
            self_time_us: 0.0,
            total_time_us: 0.0,
            children: Vec::new(),
        };
    };

    let self_time_us = node.hit_count as f64 * interval_us;
    let children: Vec<CpuCallNode> = node
        .children
        .iter()
        .map(|&child| build_call_node(child, nodes, interval_us))
        .collect();
    let children_time_us: f64 = children.iter().map(|c| c.total_time_us).sum();

    CpuCallNode {
        call_frame: node.call_frame.clone(),
        hit_count: node.hit_count,
        self_time_us,
        total_time_us: self_time_us + children_time_us,
        children,
    }
}
