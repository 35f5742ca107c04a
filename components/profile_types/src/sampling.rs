//! Allocation sampling data structures

use serde::{Deserialize, Serialize};

use crate::cpu::CallFrame;

/// A node of the allocation sample tree. The call frame fields are
/// flattened so every node exposes `functionName`, `scriptId`, `url`,
/// `lineNumber`, `columnNumber` directly, alongside `selfSize` and its
/// ordered `children`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationProfileNode {
    /// Call frame this node attributes allocations to
    #[serde(flatten)]
    pub call_frame: CallFrame,
    /// Bytes allocated by this frame itself (excluding children)
    pub self_size: u64,
    /// Ordered children (empty for leaves)
    pub children: Vec<AllocationProfileNode>,
}

impl AllocationProfileNode {
    /// The synthetic root of an allocation sample tree
    pub fn root() -> Self {
        Self {
            call_frame: CallFrame::root(),
            self_size: 0,
            children: Vec::new(),
        }
    }

    /// Bytes allocated by this node and all descendants
    pub fn total_size(&self) -> u64 {
        self.self_size + self.children.iter().map(Self::total_size).sum::<u64>()
    }
}

/// Options accepted when allocation sampling starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingOptions {
    /// Average number of bytes between samples
    pub sample_interval: u64,
    /// Maximum captured stack depth
    pub stack_depth: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            sample_interval: 32768, // Default 32KB
            stack_depth: 128,
        }
    }
}
