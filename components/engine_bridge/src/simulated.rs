//! In-memory instrumentation engine for tests and demos
//!
//! Simulates the hosting VM: a concurrent live-object registry, a logical
//! microsecond clock, and driver hooks (`allocate_object`,
//! `record_cpu_sample`, `record_allocation`, `collect_object`) that
//! synthesize the raw events a real engine would produce.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tracing::debug;

use profile_types::{
    AllocationProfileNode, CallFrame, HeapEdge, HeapEdgeType, HeapGraph, HeapNode, HeapNodeType,
    HeapObjectId, HeapSampleMarker, HeapStatsEntry, ProfileSample, ProfilerError, RawCpuCapture,
    RawProfileNode, Result, SamplingOptions,
};

use crate::capabilities::{EngineCapabilities, MIN_ALLOCATION_SAMPLING_VERSION};
use crate::engine::{EngineValue, InstrumentationEngine, ObjectHandle};

const DEFAULT_ENGINE_VERSION: &str = "6.2.414";

/// Logical clock advance per synthesized heap event (microseconds)
const EVENT_TICK_US: u64 = 100;

/// Entries per drained heap-stats batch
const STATS_BATCH_LEN: usize = 32;

#[derive(Debug, Clone)]
struct SimulatedObject {
    name: String,
    node_type: HeapNodeType,
    self_size: u64,
}

#[derive(Debug)]
struct CpuCaptureBuffer {
    record_samples: bool,
    nodes: Vec<RawProfileNode>,
    samples: Vec<ProfileSample>,
    started_at_us: u64,
}

#[derive(Debug)]
struct AllocationCaptureBuffer {
    options: SamplingOptions,
    root: AllocationProfileNode,
}

/// Simulated hosting engine backing the profilers in tests
pub struct SimulatedEngine {
    capabilities: EngineCapabilities,
    /// Live object registry: handle -> object record
    objects: DashMap<ObjectHandle, SimulatedObject>,
    /// Heap object ids assigned on demand
    assigned_ids: DashMap<ObjectHandle, HeapObjectId>,
    handles_by_id: DashMap<HeapObjectId, ObjectHandle>,
    next_handle: AtomicU64,
    /// Object ids are odd; even ids stay reserved for synthetic snapshot nodes
    next_object_id: AtomicU64,
    last_assigned_id: AtomicU64,
    /// Logical clock (microseconds)
    clock_us: AtomicU64,
    sampling_interval_us: AtomicU32,
    cpu_capture: Mutex<Option<CpuCaptureBuffer>>,
    tracking_active: AtomicBool,
    pending_deltas: Mutex<Vec<HeapStatsEntry>>,
    next_fragment: AtomicU32,
    sample_markers: Mutex<Vec<HeapSampleMarker>>,
    allocation_capture: Mutex<Option<AllocationCaptureBuffer>>,
}

impl SimulatedEngine {
    /// Create an engine reporting the default (fully capable) version
    pub fn new() -> Self {
        Self::with_engine_version(DEFAULT_ENGINE_VERSION)
    }

    /// Create an engine reporting a specific version string. Versions
    /// before 5.5 lack allocation sampling.
    pub fn with_engine_version(version: &str) -> Self {
        let engine = Self {
            capabilities: EngineCapabilities::for_version(version),
            objects: DashMap::new(),
            assigned_ids: DashMap::new(),
            handles_by_id: DashMap::new(),
            next_handle: AtomicU64::new(1),
            next_object_id: AtomicU64::new(HeapObjectId::UNDEFINED.0 + 2),
            last_assigned_id: AtomicU64::new(HeapObjectId::UNDEFINED.0),
            clock_us: AtomicU64::new(1_000_000),
            sampling_interval_us: AtomicU32::new(100),
            cpu_capture: Mutex::new(None),
            tracking_active: AtomicBool::new(false),
            pending_deltas: Mutex::new(Vec::new()),
            next_fragment: AtomicU32::new(0),
            sample_markers: Mutex::new(Vec::new()),
            allocation_capture: Mutex::new(None),
        };
        engine.seed_baseline_heap();
        engine
    }

    /// Seed the baseline objects every VM instance starts with
    fn seed_baseline_heap(&self) {
        self.insert_object("(global)", HeapNodeType::Object, 1024);
        self.insert_object("(builtins)", HeapNodeType::Native, 4096);
        self.insert_object("(interned strings)", HeapNodeType::String, 512);
    }

    fn advance_clock(&self, micros: u64) -> u64 {
        self.clock_us.fetch_add(micros, Ordering::SeqCst) + micros
    }

    fn now_us(&self) -> u64 {
        self.clock_us.load(Ordering::SeqCst)
    }

    /// Assign (or look up) the stable heap object id for a live handle
    fn assign_id(&self, handle: ObjectHandle) -> HeapObjectId {
        if let Some(existing) = self.assigned_ids.get(&handle) {
            return *existing;
        }
        let id = HeapObjectId(self.next_object_id.fetch_add(2, Ordering::SeqCst));
        self.assigned_ids.insert(handle, id);
        self.handles_by_id.insert(id, handle);
        self.last_assigned_id.store(id.0, Ordering::SeqCst);
        id
    }

    fn insert_object(&self, name: &str, node_type: HeapNodeType, self_size: u64) -> ObjectHandle {
        let handle = ObjectHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.objects.insert(
            handle,
            SimulatedObject {
                name: name.to_string(),
                node_type,
                self_size,
            },
        );
        let timestamp_us = self.advance_clock(EVENT_TICK_US);

        if self.tracking_active.load(Ordering::SeqCst) {
            // Tracking assigns ids eagerly so the high-water mark advances
            let id = self.assign_id(handle);
            let fragment_index = self.next_fragment.fetch_add(1, Ordering::SeqCst);
            self.pending_deltas.lock().push(HeapStatsEntry {
                fragment_index,
                count: 1,
                size: self_size,
            });
            self.sample_markers.lock().push(HeapSampleMarker {
                timestamp_us,
                last_assigned_id: id,
            });
        }
        handle
    }

    /// Allocate a named object on the simulated heap and return its handle
    pub fn allocate_object(&self, name: &str, self_size: u64) -> EngineValue {
        EngineValue::Object(self.insert_object(name, HeapNodeType::Object, self_size))
    }

    /// Drop an object from the live set, as a garbage collection would.
    /// Returns false when the value is not a live object.
    pub fn collect_object(&self, value: &EngineValue) -> bool {
        let EngineValue::Object(handle) = value else {
            return false;
        };
        let removed = self.objects.remove(handle).is_some();
        if removed {
            if let Some((_, id)) = self.assigned_ids.remove(handle) {
                self.handles_by_id.remove(&id);
            }
        }
        removed
    }

    /// Record one CPU sample with the given call stack, leaf last.
    /// Only legal while a CPU capture is in flight.
    pub fn record_cpu_sample(&self, stack: &[CallFrame]) -> Result<()> {
        let mut guard = self.cpu_capture.lock();
        let capture = guard
            .as_mut()
            .ok_or_else(|| ProfilerError::invalid_state("no cpu capture is in flight"))?;

        let interval = self.sampling_interval_us.load(Ordering::SeqCst) as u64;
        let timestamp_us = self.advance_clock(interval);

        let mut current = 0usize;
        for frame in stack {
            let existing = capture.nodes[current].children.iter().copied().find(|&id| {
                let child = &capture.nodes[id as usize];
                child.call_frame.function_name == frame.function_name
                    && child.call_frame.script_id == frame.script_id
                    && child.call_frame.line_number == frame.line_number
            });
            current = match existing {
                Some(id) => id as usize,
                None => {
                    let id = capture.nodes.len() as u32;
                    capture.nodes.push(RawProfileNode {
                        id,
                        call_frame: frame.clone(),
                        hit_count: 0,
                        children: Vec::new(),
                    });
                    capture.nodes[current].children.push(id);
                    id as usize
                }
            };
        }
        capture.nodes[current].hit_count += 1;
        if capture.record_samples {
            capture.samples.push(ProfileSample {
                node_id: current as u32,
                timestamp_us: timestamp_us as f64,
            });
        }
        Ok(())
    }

    /// Attribute an allocation of `size` bytes to the given call stack.
    /// Only legal while allocation sampling is in flight.
    pub fn record_allocation(&self, stack: &[CallFrame], size: u64) -> Result<()> {
        let mut guard = self.allocation_capture.lock();
        let capture = guard
            .as_mut()
            .ok_or_else(|| ProfilerError::invalid_state("allocation sampling is not active"))?;

        let depth = capture.options.stack_depth as usize;
        let mut node = &mut capture.root;
        for frame in stack.iter().take(depth) {
            let position = node.children.iter().position(|c| c.call_frame == *frame);
            let index = match position {
                Some(index) => index,
                None => {
                    node.children.push(AllocationProfileNode {
                        call_frame: frame.clone(),
                        self_size: 0,
                        children: Vec::new(),
                    });
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node.self_size += size;
        self.advance_clock(EVENT_TICK_US);
        Ok(())
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentationEngine for SimulatedEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities.clone()
    }

    fn begin_cpu_capture(&self, record_samples: bool) -> Result<()> {
        let mut guard = self.cpu_capture.lock();
        if guard.is_some() {
            return Err(ProfilerError::invalid_state(
                "a cpu capture is already in flight",
            ));
        }
        debug!("simulated engine: cpu capture started");
        *guard = Some(CpuCaptureBuffer {
            record_samples,
            nodes: vec![RawProfileNode {
                id: 0,
                call_frame: CallFrame::root(),
                hit_count: 0,
                children: Vec::new(),
            }],
            samples: Vec::new(),
            started_at_us: self.now_us(),
        });
        Ok(())
    }

    fn end_cpu_capture(&self) -> Result<RawCpuCapture> {
        let capture = self
            .cpu_capture
            .lock()
            .take()
            .ok_or_else(|| ProfilerError::invalid_state("no cpu capture is in flight"))?;
        debug!(
            "simulated engine: cpu capture ended with {} nodes, {} samples",
            capture.nodes.len(),
            capture.samples.len()
        );
        Ok(RawCpuCapture {
            nodes: capture.nodes,
            samples: capture.samples,
            sampling_interval_us: self.sampling_interval_us.load(Ordering::SeqCst),
            start_time_us: capture.started_at_us as f64,
            end_time_us: self.now_us() as f64,
        })
    }

    fn set_sampling_interval(&self, interval_us: u32) -> Result<()> {
        if self.cpu_capture.lock().is_some() {
            return Err(ProfilerError::invalid_state(
                "sampling interval cannot change while a capture is in flight",
            ));
        }
        self.sampling_interval_us.store(interval_us, Ordering::SeqCst);
        Ok(())
    }

    fn capture_heap_graph(&self) -> Result<HeapGraph> {
        let mut strings = Vec::new();
        let mut interned: HashMap<String, u32> = HashMap::new();
        let mut intern = |strings: &mut Vec<String>, s: &str| -> u32 {
            if let Some(&index) = interned.get(s) {
                return index;
            }
            let index = strings.len() as u32;
            strings.push(s.to_string());
            interned.insert(s.to_string(), index);
            index
        };

        // Live objects sorted by handle for a stable table order
        let mut live: Vec<(ObjectHandle, SimulatedObject)> = self
            .objects
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        live.sort_by_key(|(handle, _)| handle.0);

        let root_name = intern(&mut strings, "(root)");
        let mut nodes = vec![HeapNode {
            node_type: HeapNodeType::Synthetic,
            name_index: root_name,
            id: HeapObjectId(0),
            self_size: 0,
            edge_count: live.len() as u32,
        }];
        let mut edges = Vec::with_capacity(live.len());

        for (index, (handle, object)) in live.iter().enumerate() {
            let name_index = intern(&mut strings, &object.name);
            nodes.push(HeapNode {
                node_type: object.node_type,
                name_index,
                id: self.assign_id(*handle),
                self_size: object.self_size,
                edge_count: 0,
            });
            edges.push(HeapEdge {
                edge_type: HeapEdgeType::Property,
                name_or_index: name_index,
                to_node: (index + 1) as u32,
            });
        }

        let samples = self.sample_markers.lock().clone();
        self.advance_clock(EVENT_TICK_US);
        debug!(
            "simulated engine: heap graph captured with {} nodes, {} edges",
            nodes.len(),
            edges.len()
        );
        Ok(HeapGraph {
            strings,
            nodes,
            edges,
            samples,
        })
    }

    fn begin_heap_object_tracking(&self) {
        debug!("simulated engine: heap object tracking started");
        self.tracking_active.store(true, Ordering::SeqCst);
    }

    fn end_heap_object_tracking(&self) {
        debug!("simulated engine: heap object tracking stopped");
        self.tracking_active.store(false, Ordering::SeqCst);
    }

    fn drain_allocation_deltas(&self) -> Vec<Vec<HeapStatsEntry>> {
        let mut pending = self.pending_deltas.lock();
        if pending.is_empty() {
            return Vec::new();
        }
        let drained: Vec<HeapStatsEntry> = pending.drain(..).collect();
        drained
            .chunks(STATS_BATCH_LEN)
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    fn last_assigned_object_id(&self) -> HeapObjectId {
        HeapObjectId(self.last_assigned_id.load(Ordering::SeqCst))
    }

    fn resolve_object_id(&self, value: &EngineValue) -> Option<HeapObjectId> {
        match value {
            EngineValue::Undefined => Some(HeapObjectId::UNDEFINED),
            EngineValue::Object(handle) if self.objects.contains_key(handle) => {
                Some(self.assign_id(*handle))
            }
            _ => None,
        }
    }

    fn resolve_id_to_object(&self, id: HeapObjectId) -> Option<EngineValue> {
        if id == HeapObjectId::UNDEFINED {
            return Some(EngineValue::Undefined);
        }
        self.handles_by_id
            .get(&id)
            .map(|handle| EngineValue::Object(*handle))
    }

    fn begin_allocation_sampling(&self, options: &SamplingOptions) -> Result<()> {
        if !self.capabilities.allocation_sampling {
            return Err(ProfilerError::capability_unsupported(
                "allocation sampling",
                MIN_ALLOCATION_SAMPLING_VERSION,
            ));
        }
        let mut guard = self.allocation_capture.lock();
        if guard.is_some() {
            return Err(ProfilerError::invalid_state(
                "allocation sampling is already in flight",
            ));
        }
        debug!(
            "simulated engine: allocation sampling started (interval {} bytes)",
            options.sample_interval
        );
        *guard = Some(AllocationCaptureBuffer {
            options: *options,
            root: AllocationProfileNode::root(),
        });
        Ok(())
    }

    fn end_allocation_sampling(&self) -> Result<AllocationProfileNode> {
        if !self.capabilities.allocation_sampling {
            return Err(ProfilerError::capability_unsupported(
                "allocation sampling",
                MIN_ALLOCATION_SAMPLING_VERSION,
            ));
        }
        let capture = self
            .allocation_capture
            .lock()
            .take()
            .ok_or_else(|| ProfilerError::invalid_state("allocation sampling is not active"))?;
        debug!("simulated engine: allocation sampling ended");
        Ok(capture.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, line: i32) -> CallFrame {
        CallFrame {
            function_name: name.to_string(),
            script_id: "1".to_string(),
            url: "app.js".to_string(),
            line_number: line,
            column_number: 0,
        }
    }

    #[test]
    fn test_object_ids_are_stable() {
        let engine = SimulatedEngine::new();
        let value = engine.allocate_object("widget", 128);
        let first = engine.resolve_object_id(&value).unwrap();
        let second = engine.resolve_object_id(&value).unwrap();
        assert_eq!(first, second);
        assert!(first.0 > HeapObjectId::UNDEFINED.0);
    }

    #[test]
    fn test_undefined_has_reserved_id() {
        let engine = SimulatedEngine::new();
        assert_eq!(
            engine.resolve_object_id(&EngineValue::Undefined),
            Some(HeapObjectId::UNDEFINED)
        );
    }

    #[test]
    fn test_scalars_have_no_id() {
        let engine = SimulatedEngine::new();
        assert!(engine.resolve_object_id(&EngineValue::Number(42.0)).is_none());
        assert!(engine.resolve_object_id(&EngineValue::Null).is_none());
    }

    #[test]
    fn test_collected_object_resolves_to_none() {
        let engine = SimulatedEngine::new();
        let value = engine.allocate_object("ephemeral", 64);
        let id = engine.resolve_object_id(&value).unwrap();
        assert!(engine.collect_object(&value));
        assert!(engine.resolve_object_id(&value).is_none());
        assert!(engine.resolve_id_to_object(id).is_none());
    }

    #[test]
    fn test_cpu_capture_merges_shared_prefixes() {
        let engine = SimulatedEngine::new();
        engine.begin_cpu_capture(false).unwrap();
        engine
            .record_cpu_sample(&[frame("main", 1), frame("parse", 10)])
            .unwrap();
        engine
            .record_cpu_sample(&[frame("main", 1), frame("render", 20)])
            .unwrap();
        let raw = engine.end_cpu_capture().unwrap();
        // root + main + parse + render
        assert_eq!(raw.nodes.len(), 4);
        assert_eq!(raw.nodes[1].children.len(), 2);
    }

    #[test]
    fn test_sample_without_capture_fails() {
        let engine = SimulatedEngine::new();
        assert!(engine.record_cpu_sample(&[frame("main", 1)]).is_err());
    }

    #[test]
    fn test_tracking_buffers_deltas() {
        let engine = SimulatedEngine::new();
        engine.begin_heap_object_tracking();
        engine.allocate_object("tracked", 256);
        engine.allocate_object("tracked2", 512);
        engine.end_heap_object_tracking();

        let batches = engine.drain_allocation_deltas();
        let total: usize = batches.iter().map(Vec::len).sum();
        assert_eq!(total, 2);
        assert!(engine.drain_allocation_deltas().is_empty());
    }

    #[test]
    fn test_heap_graph_contains_live_objects() {
        let engine = SimulatedEngine::new();
        engine.allocate_object("widget", 128);
        let graph = engine.capture_heap_graph().unwrap();
        assert!(graph.validate().is_ok());
        assert!(graph
            .nodes
            .iter()
            .any(|n| graph.node_name(n) == "widget"));
    }

    #[test]
    fn test_allocation_sampling_builds_tree() {
        let engine = SimulatedEngine::new();
        engine
            .begin_allocation_sampling(&SamplingOptions::default())
            .unwrap();
        engine
            .record_allocation(&[frame("main", 1), frame("alloc", 5)], 4096)
            .unwrap();
        engine
            .record_allocation(&[frame("main", 1), frame("alloc", 5)], 4096)
            .unwrap();
        let root = engine.end_allocation_sampling().unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.total_size(), 8192);
    }

    #[test]
    fn test_legacy_engine_rejects_allocation_sampling() {
        let engine = SimulatedEngine::with_engine_version("5.2.361");
        let err = engine
            .begin_allocation_sampling(&SamplingOptions::default())
            .unwrap_err();
        assert!(matches!(err, ProfilerError::CapabilityUnsupported { .. }));
    }
}
