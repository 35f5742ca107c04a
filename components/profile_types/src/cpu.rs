//! CPU profile data structures
//!
//! Raw flat captures as accumulated by the engine, and the finalized
//! call-tree shape built from them at stop time.

use serde::{Deserialize, Serialize};

/// Call frame information shared by CPU and allocation profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    /// Function name
    pub function_name: String,
    /// Script ID
    pub script_id: String,
    /// URL of the script
    pub url: String,
    /// Line number (0-based)
    pub line_number: i32,
    /// Column number (0-based)
    pub column_number: i32,
}

impl Default for CallFrame {
    fn default() -> Self {
        Self {
            function_name: String::new(),
            script_id: "0".to_string(),
            url: String::new(),
            line_number: 0,
            column_number: 0,
        }
    }
}

impl CallFrame {
    /// The synthetic frame placed at the root of every call tree
    pub fn root() -> Self {
        Self {
            function_name: "(root)".to_string(),
            ..Self::default()
        }
    }
}

/// A node of the finalized CPU call tree, with per-frame timing derived
/// from hit counts and the sampling interval active during capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuCallNode {
    /// Call frame information
    pub call_frame: CallFrame,
    /// Number of samples where this was the top frame
    pub hit_count: u32,
    /// Time spent only in this frame (microseconds)
    pub self_time_us: f64,
    /// Time spent in this frame and its children (microseconds)
    pub total_time_us: f64,
    /// Ordered children (empty for leaves)
    pub children: Vec<CpuCallNode>,
}

/// One entry of the raw sample timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSample {
    /// Flat-node id of the frame on top of the stack
    pub node_id: u32,
    /// Timestamp when the sample was taken (microseconds)
    pub timestamp_us: f64,
}

/// Flat profile node as accumulated by the engine during capture.
/// Node ids double as indices into the capture's `nodes` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfileNode {
    /// Unique identifier, equal to this node's table index
    pub id: u32,
    /// Call frame information
    pub call_frame: CallFrame,
    /// Number of samples where this was the top frame
    pub hit_count: u32,
    /// Child node ids
    pub children: Vec<u32>,
}

/// Everything the engine hands back when a CPU capture ends.
/// Index 0 of `nodes` is the synthetic root.
#[derive(Debug, Clone)]
pub struct RawCpuCapture {
    /// Flat node table
    pub nodes: Vec<RawProfileNode>,
    /// Ordered sample timeline
    pub samples: Vec<ProfileSample>,
    /// Sampling interval active during the capture (microseconds)
    pub sampling_interval_us: u32,
    /// Capture start time (microseconds)
    pub start_time_us: f64,
    /// Capture end time (microseconds)
    pub end_time_us: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_frame() {
        let frame = CallFrame::root();
        assert_eq!(frame.function_name, "(root)");
        assert_eq!(frame.script_id, "0");
    }

    #[test]
    fn test_call_frame_serializes_camel_case() {
        let frame = CallFrame {
            function_name: "main".to_string(),
            script_id: "1".to_string(),
            url: "app.js".to_string(),
            line_number: 10,
            column_number: 5,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["functionName"], "main");
        assert_eq!(json["lineNumber"], 10);
        assert_eq!(json["columnNumber"], 5);
    }
}
