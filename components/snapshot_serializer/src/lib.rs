//! Streaming JSON serialization for profiling artifacts
//!
//! Converts a frozen [`HeapGraph`](profile_types::HeapGraph) into its JSON
//! document in three consumption modes:
//!
//! - **Chunked**: [`serialize_graph_incremental`] delivers string fragments
//!   in document order to a callback, then signals completion exactly once.
//! - **Complete**: [`serialize_graph_to_string`] materializes the whole
//!   document; defined as the concatenation of the chunked mode's output.
//! - **Stream**: [`SnapshotStream`] implements `Iterator` and
//!   `std::io::Read`, producing chunks lazily as the consumer pulls.
//!
//! Chunk delivery is synchronous: the producer does not advance until the
//! consumer's callback returns, so no buffering is needed for backpressure.
//! A serialization failure returns an error WITHOUT the completion signal,
//! telling the consumer the document is incomplete. Tree-shaped artifacts
//! (CPU and allocation profiles) reuse the same surface through
//! [`ProfileStream`].

mod chunks;
mod meta;
mod stream;

pub use chunks::CHUNK_TARGET_BYTES;
pub use meta::{EDGE_FIELDS, NODE_FIELDS, SAMPLE_FIELDS};
pub use stream::{ProfileStream, SnapshotStream};

use profile_types::{HeapGraph, Result};
use tracing::debug;

use chunks::ChunkCursor;

/// Serialize a heap graph incrementally. `on_chunk` is invoked zero or
/// more times in document order; `on_done` exactly once afterwards.
/// Concatenating all chunks yields the complete JSON document.
pub fn serialize_graph_incremental<C, D>(graph: &HeapGraph, mut on_chunk: C, on_done: D) -> Result<()>
where
    C: FnMut(&str),
    D: FnOnce(),
{
    graph.validate()?;
    let mut cursor = ChunkCursor::new();
    let mut chunks = 0usize;
    let mut bytes = 0usize;
    while let Some(chunk) = cursor.next_chunk(graph) {
        chunks += 1;
        bytes += chunk.len();
        on_chunk(&chunk);
    }
    debug!("heap snapshot serialized in {} chunks ({} bytes)", chunks, bytes);
    on_done();
    Ok(())
}

/// Serialize a heap graph into one complete JSON string
pub fn serialize_graph_to_string(graph: &HeapGraph) -> Result<String> {
    let mut document = String::new();
    serialize_graph_incremental(graph, |chunk| document.push_str(chunk), || {})?;
    Ok(document)
}
