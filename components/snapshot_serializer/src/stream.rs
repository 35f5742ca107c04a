//! Pull-based stream wrappers over the chunk sequence
//!
//! The streams only produce the next chunk when the consumer asks for it,
//! so a slow sink never forces the whole document into memory.

use std::io::{self, Read};
use std::sync::Arc;

use profile_types::{HeapGraph, Result};

use crate::chunks::ChunkCursor;

/// Readable byte stream over a snapshot's JSON document
pub struct SnapshotStream {
    graph: Arc<HeapGraph>,
    cursor: ChunkCursor,
    pending: Vec<u8>,
    consumed: usize,
}

impl SnapshotStream {
    /// Validate the graph and open a stream over its document
    pub fn new(graph: Arc<HeapGraph>) -> Result<Self> {
        graph.validate()?;
        Ok(Self {
            graph,
            cursor: ChunkCursor::new(),
            pending: Vec::new(),
            consumed: 0,
        })
    }
}

impl Iterator for SnapshotStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.cursor.next_chunk(&self.graph)
    }
}

impl Read for SnapshotStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.consumed >= self.pending.len() {
            match self.cursor.next_chunk(&self.graph) {
                Some(chunk) => {
                    self.pending = chunk.into_bytes();
                    self.consumed = 0;
                }
                None => return Ok(0),
            }
        }
        let available = &self.pending[self.consumed..];
        let len = available.len().min(buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.consumed += len;
        Ok(len)
    }
}

/// Single-chunk stream over an already-materialized JSON document, used by
/// the tree-shaped artifacts (CPU and allocation profiles)
pub struct ProfileStream {
    document: Option<String>,
    pending: Vec<u8>,
    consumed: usize,
}

impl ProfileStream {
    /// Wrap a complete JSON document
    pub fn new(document: String) -> Self {
        Self {
            document: Some(document),
            pending: Vec::new(),
            consumed: 0,
        }
    }
}

impl Iterator for ProfileStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.document.take()
    }
}

impl Read for ProfileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.consumed >= self.pending.len() {
            match self.document.take() {
                Some(document) => {
                    self.pending = document.into_bytes();
                    self.consumed = 0;
                }
                None => return Ok(0),
            }
        }
        if self.consumed >= self.pending.len() {
            return Ok(0);
        }
        let available = &self.pending[self.consumed..];
        let len = available.len().min(buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.consumed += len;
        Ok(len)
    }
}
