//! Engine capability reporting
//!
//! Capabilities are derived from the engine version string once and cached;
//! call sites never parse version strings themselves.

/// Minimum engine version carrying the allocation-sampling instrumentation
pub const MIN_ALLOCATION_SAMPLING_VERSION: &str = "V8 5.5";

/// Feature set reported by a hosting engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Version string reported by the engine (e.g. "6.2.414")
    pub engine_version: String,
    /// CPU call-tree sampling is available
    pub cpu_profiling: bool,
    /// Full heap graph capture is available
    pub heap_snapshots: bool,
    /// Allocation/deallocation delta tracking is available
    pub heap_object_tracking: bool,
    /// Interval-based allocation sampling is available
    pub allocation_sampling: bool,
}

impl EngineCapabilities {
    /// Derive the capability set for an engine version string.
    /// Allocation sampling landed in 5.5; the other instrumentation
    /// predates every version this library supports.
    pub fn for_version(version: &str) -> Self {
        Self {
            engine_version: version.to_string(),
            cpu_profiling: true,
            heap_snapshots: true,
            heap_object_tracking: true,
            allocation_sampling: at_least(version, 5, 5),
        }
    }
}

/// Compare a "major.minor[.patch]" version string against a threshold.
/// Unparseable versions report false so missing instrumentation surfaces
/// as a capability error rather than a crash later.
fn at_least(version: &str, major: u32, minor: u32) -> bool {
    let mut parts = version.split('.');
    let parsed_major = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    let parsed_minor = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    match (parsed_major, parsed_minor) {
        (Some(maj), _) if maj > major => true,
        (Some(maj), Some(min)) if maj == major => min >= minor,
        (Some(maj), None) if maj == major => minor == 0,
        _ => false,
    }
}
