//! Chunk production over a frozen heap graph
//!
//! A [`ChunkCursor`] is a lazy, finite, non-restartable sequence of
//! document fragments. It holds only stage and index, so it can be driven
//! against a borrowed graph (callback mode) or an owned one (stream mode).
//! Nodes and edges are emitted in bounded batches, keeping every chunk
//! near [`CHUNK_TARGET_BYTES`] regardless of graph size.

use profile_types::HeapGraph;

/// Target chunk size in bytes
pub const CHUNK_TARGET_BYTES: usize = 64 * 1024;

/// Node records per chunk (5 numeric fields each)
const NODE_BATCH: usize = 4096;

/// Edge records per chunk (3 numeric fields each)
const EDGE_BATCH: usize = 8192;

/// String records per chunk upper bound; the byte target usually flushes
/// first
const STRING_BATCH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    Nodes,
    Edges,
    Samples,
    Strings,
    Done,
}

/// Cursor over the chunk sequence of one snapshot document
#[derive(Debug)]
pub(crate) struct ChunkCursor {
    stage: Stage,
    index: usize,
}

impl ChunkCursor {
    pub(crate) fn new() -> Self {
        Self {
            stage: Stage::Header,
            index: 0,
        }
    }

    /// Produce the next document fragment, or None after the document is
    /// complete
    pub(crate) fn next_chunk(&mut self, graph: &HeapGraph) -> Option<String> {
        match self.stage {
            Stage::Header => {
                self.stage = Stage::Nodes;
                self.index = 0;
                Some(crate::meta::document_header(graph))
            }
            Stage::Nodes => {
                if self.index >= graph.nodes.len() {
                    self.stage = Stage::Edges;
                    self.index = 0;
                    return Some("],\"edges\":[".to_string());
                }
                let end = (self.index + NODE_BATCH).min(graph.nodes.len());
                let mut chunk = String::with_capacity((end - self.index) * 16);
                for (offset, node) in graph.nodes[self.index..end].iter().enumerate() {
                    if self.index + offset > 0 {
                        chunk.push(',');
                    }
                    chunk.push_str(&format!(
                        "{},{},{},{},{}",
                        node.node_type.index(),
                        node.name_index,
                        node.id.0,
                        node.self_size,
                        node.edge_count
                    ));
                }
                self.index = end;
                Some(chunk)
            }
            Stage::Edges => {
                if self.index >= graph.edges.len() {
                    self.stage = Stage::Samples;
                    self.index = 0;
                    return Some("],\"samples\":[".to_string());
                }
                let end = (self.index + EDGE_BATCH).min(graph.edges.len());
                let mut chunk = String::with_capacity((end - self.index) * 12);
                for (offset, edge) in graph.edges[self.index..end].iter().enumerate() {
                    if self.index + offset > 0 {
                        chunk.push(',');
                    }
                    // Targets are encoded as node-table offsets, per the
                    // snapshot wire format
                    chunk.push_str(&format!(
                        "{},{},{}",
                        edge.edge_type.index(),
                        edge.name_or_index,
                        edge.to_node as usize * crate::meta::NODE_FIELDS.len()
                    ));
                }
                self.index = end;
                Some(chunk)
            }
            Stage::Samples => {
                if self.index >= graph.samples.len() {
                    self.stage = Stage::Strings;
                    self.index = 0;
                    return Some("],\"strings\":[".to_string());
                }
                let mut chunk = String::new();
                for (offset, sample) in graph.samples[self.index..].iter().enumerate() {
                    if self.index + offset > 0 {
                        chunk.push(',');
                    }
                    chunk.push_str(&format!(
                        "{},{}",
                        sample.timestamp_us, sample.last_assigned_id.0
                    ));
                }
                self.index = graph.samples.len();
                Some(chunk)
            }
            Stage::Strings => {
                if self.index >= graph.strings.len() {
                    self.stage = Stage::Done;
                    return Some("]}".to_string());
                }
                let mut chunk = String::new();
                let mut emitted = 0;
                while self.index < graph.strings.len()
                    && emitted < STRING_BATCH
                    && chunk.len() < CHUNK_TARGET_BYTES
                {
                    if self.index > 0 {
                        chunk.push(',');
                    }
                    // serde_json handles escaping; strings may hold
                    // arbitrary user content
                    chunk.push_str(
                        &serde_json::Value::from(graph.strings[self.index].as_str()).to_string(),
                    );
                    self.index += 1;
                    emitted += 1;
                }
                Some(chunk)
            }
            Stage::Done => None,
        }
    }
}
