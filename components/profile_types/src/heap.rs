//! Heap snapshot graph tables, heap object ids, and snapshot comparison
//! summaries.
//!
//! A [`HeapGraph`] is a frozen object graph: node and edge tables indexing
//! into a deduplicated string table, plus optional sample markers recorded
//! while heap object tracking was active. Edge ownership follows node
//! order: the first node's `edge_count` edges come first in the edge table,
//! then the second node's, and so on.

use serde::{Deserialize, Serialize};

use crate::errors::{ProfilerError, Result};

/// Stable process-wide identifier for a live heap value.
///
/// Ids are assigned on demand, monotonically increasing, and survive
/// garbage collections for as long as the value does.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct HeapObjectId(pub u64);

impl HeapObjectId {
    /// Reserved id owned by the `undefined` value
    pub const UNDEFINED: HeapObjectId = HeapObjectId(1);
}

/// Classification of a heap node, in wire-format table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeapNodeType {
    /// Engine-internal node hidden from user code
    Hidden,
    /// Array object
    Array,
    /// String value
    String,
    /// Plain object
    Object,
    /// Compiled code
    Code,
    /// Function closure
    Closure,
    /// Regular expression
    Regexp,
    /// Heap number
    Number,
    /// Host-provided native object
    Native,
    /// Synthetic node introduced by the snapshot itself (e.g. the root)
    Synthetic,
}

impl HeapNodeType {
    /// Wire-format order of the node type table
    pub const ALL: [HeapNodeType; 10] = [
        HeapNodeType::Hidden,
        HeapNodeType::Array,
        HeapNodeType::String,
        HeapNodeType::Object,
        HeapNodeType::Code,
        HeapNodeType::Closure,
        HeapNodeType::Regexp,
        HeapNodeType::Number,
        HeapNodeType::Native,
        HeapNodeType::Synthetic,
    ];

    /// Wire-format name of this type
    pub fn as_str(self) -> &'static str {
        match self {
            HeapNodeType::Hidden => "hidden",
            HeapNodeType::Array => "array",
            HeapNodeType::String => "string",
            HeapNodeType::Object => "object",
            HeapNodeType::Code => "code",
            HeapNodeType::Closure => "closure",
            HeapNodeType::Regexp => "regexp",
            HeapNodeType::Number => "number",
            HeapNodeType::Native => "native",
            HeapNodeType::Synthetic => "synthetic",
        }
    }

    /// Position of this type in the wire-format table
    pub fn index(self) -> u32 {
        match self {
            HeapNodeType::Hidden => 0,
            HeapNodeType::Array => 1,
            HeapNodeType::String => 2,
            HeapNodeType::Object => 3,
            HeapNodeType::Code => 4,
            HeapNodeType::Closure => 5,
            HeapNodeType::Regexp => 6,
            HeapNodeType::Number => 7,
            HeapNodeType::Native => 8,
            HeapNodeType::Synthetic => 9,
        }
    }
}

/// Classification of a heap edge, in wire-format table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeapEdgeType {
    /// Variable captured from a function context
    Context,
    /// Indexed array element
    Element,
    /// Named object property
    Property,
    /// Engine-internal reference
    Internal,
    /// Hidden reference
    Hidden,
    /// Shortcut edge added by the snapshot builder
    Shortcut,
    /// Weak reference that does not keep its target alive
    Weak,
}

impl HeapEdgeType {
    /// Wire-format order of the edge type table
    pub const ALL: [HeapEdgeType; 7] = [
        HeapEdgeType::Context,
        HeapEdgeType::Element,
        HeapEdgeType::Property,
        HeapEdgeType::Internal,
        HeapEdgeType::Hidden,
        HeapEdgeType::Shortcut,
        HeapEdgeType::Weak,
    ];

    /// Wire-format name of this type
    pub fn as_str(self) -> &'static str {
        match self {
            HeapEdgeType::Context => "context",
            HeapEdgeType::Element => "element",
            HeapEdgeType::Property => "property",
            HeapEdgeType::Internal => "internal",
            HeapEdgeType::Hidden => "hidden",
            HeapEdgeType::Shortcut => "shortcut",
            HeapEdgeType::Weak => "weak",
        }
    }

    /// Position of this type in the wire-format table
    pub fn index(self) -> u32 {
        match self {
            HeapEdgeType::Context => 0,
            HeapEdgeType::Element => 1,
            HeapEdgeType::Property => 2,
            HeapEdgeType::Internal => 3,
            HeapEdgeType::Hidden => 4,
            HeapEdgeType::Shortcut => 5,
            HeapEdgeType::Weak => 6,
        }
    }

    /// Whether `name_or_index` refers to the string table for this type
    pub fn names_are_strings(self) -> bool {
        !matches!(self, HeapEdgeType::Element | HeapEdgeType::Hidden)
    }
}

/// One record of the node table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapNode {
    /// Node classification
    pub node_type: HeapNodeType,
    /// Index of this node's name in the string table
    pub name_index: u32,
    /// Heap object id of the value this node represents
    pub id: HeapObjectId,
    /// Shallow size in bytes
    pub self_size: u64,
    /// Number of edges owned by this node
    pub edge_count: u32,
}

/// One record of the edge table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapEdge {
    /// Edge classification
    pub edge_type: HeapEdgeType,
    /// String-table index for named edges, element index otherwise
    pub name_or_index: u32,
    /// Index of the target node in the node table
    pub to_node: u32,
}

/// Timestamp marker correlating tracking time with assigned object ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapSampleMarker {
    /// Timestamp when the marker was recorded (microseconds)
    pub timestamp_us: u64,
    /// Highest object id assigned at that moment
    pub last_assigned_id: HeapObjectId,
}

/// A frozen heap object graph
#[derive(Debug, Clone, Default)]
pub struct HeapGraph {
    /// Deduplicated strings referenced by nodes and edges
    pub strings: Vec<String>,
    /// Node table
    pub nodes: Vec<HeapNode>,
    /// Edge table, ordered by owning node
    pub edges: Vec<HeapEdge>,
    /// Sample markers recorded while tracking was active
    pub samples: Vec<HeapSampleMarker>,
}

impl HeapGraph {
    /// Resolve a node's name against the string table
    pub fn node_name(&self, node: &HeapNode) -> &str {
        self.strings
            .get(node.name_index as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Check the table invariants: every cross-table reference must be a
    /// valid index, and per-node edge counts must cover the edge table
    /// exactly.
    pub fn validate(&self) -> Result<()> {
        let owned: u64 = self.nodes.iter().map(|n| n.edge_count as u64).sum();
        if owned != self.edges.len() as u64 {
            return Err(ProfilerError::serialization(format!(
                "edge ownership mismatch: nodes claim {} edges, table holds {}",
                owned,
                self.edges.len()
            )));
        }
        for node in &self.nodes {
            if node.name_index as usize >= self.strings.len() {
                return Err(ProfilerError::serialization(format!(
                    "node name index {} outside string table of {}",
                    node.name_index,
                    self.strings.len()
                )));
            }
        }
        for edge in &self.edges {
            if edge.to_node as usize >= self.nodes.len() {
                return Err(ProfilerError::serialization(format!(
                    "edge target {} outside node table of {}",
                    edge.to_node,
                    self.nodes.len()
                )));
            }
            if edge.edge_type.names_are_strings()
                && edge.name_or_index as usize >= self.strings.len()
            {
                return Err(ProfilerError::serialization(format!(
                    "edge name index {} outside string table of {}",
                    edge.name_or_index,
                    self.strings.len()
                )));
            }
        }
        Ok(())
    }

    /// Largest heap object id present in the node table
    pub fn max_heap_object_id(&self) -> HeapObjectId {
        self.nodes
            .iter()
            .map(|n| n.id)
            .max()
            .unwrap_or(HeapObjectId(0))
    }
}

/// One allocation-delta record drained by `get_heap_stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapStatsEntry {
    /// Index of the tracking-timeline fragment this delta belongs to
    pub fragment_index: u32,
    /// Number of objects in the fragment
    pub count: u32,
    /// Total size of the fragment in bytes
    pub size: u64,
}

/// Structural difference between two heap snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDiff {
    /// Nodes present in the other snapshot but not in this one
    pub nodes_added: u32,
    /// Nodes present in this snapshot but not in the other
    pub nodes_removed: u32,
    /// Total self size of added nodes (bytes)
    pub size_added: u64,
    /// Total self size of removed nodes (bytes)
    pub size_removed: u64,
    /// Per-node-type breakdown, ordered by type table position
    pub entries: Vec<SnapshotDiffEntry>,
}

/// Per-node-type slice of a snapshot diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDiffEntry {
    /// Node classification this entry aggregates
    pub node_type: HeapNodeType,
    /// Nodes of this type that appeared
    pub added_count: u32,
    /// Nodes of this type that disappeared
    pub removed_count: u32,
    /// Net self-size change in bytes
    pub size_delta: i64,
}
