//! Bounded out-of-order segment queue
//!
//! Segments are keyed by their absolute offset in the stream's sequence
//! space (a `u64` that does not wrap), so ordering survives 32-bit
//! sequence number wraparound. Capacity is enforced up front: a segment
//! that does not fit is refused and nothing already queued is touched.

use std::collections::BTreeMap;

use super::config::{DEFAULT_QUEUE_BYTES, DEFAULT_QUEUE_SEGMENTS};
use super::segment::TcpSegment;
use crate::error::ReassemblyError;

/// Sequence-ordered buffer of pending segments
#[derive(Debug)]
pub struct StreamQueue {
    segments: BTreeMap<u64, TcpSegment>,
    bytes: usize,
    max_segments: usize,
    max_bytes: usize,
}

impl StreamQueue {
    pub fn new(max_segments: usize, max_bytes: usize) -> Self {
        Self {
            segments: BTreeMap::new(),
            bytes: 0,
            max_segments,
            max_bytes,
        }
    }

    /// Buffer `segment` at stream `offset`
    ///
    /// Returns `Ok(false)` when a segment is already queued at that
    /// offset; the first copy is kept.
    pub fn append(&mut self, offset: u64, segment: TcpSegment) -> Result<bool, ReassemblyError> {
        if self.segments.contains_key(&offset) {
            return Ok(false);
        }
        let len = segment.payload.len();
        if self.segments.len() >= self.max_segments || self.bytes + len > self.max_bytes {
            return Err(ReassemblyError::QueueFull {
                segments: self.segments.len(),
                bytes: self.bytes,
            });
        }
        self.bytes += len;
        self.segments.insert(offset, segment);
        Ok(true)
    }

    /// True iff the lowest buffered offset equals `expected`
    pub fn has_next(&self, expected: u64) -> bool {
        self.segments
            .keys()
            .next()
            .is_some_and(|&offset| offset == expected)
    }

    /// Remove and return the lowest buffered segment
    pub fn next(&mut self) -> Option<(u64, TcpSegment)> {
        let (offset, segment) = self.segments.pop_first()?;
        self.bytes -= segment.payload.len();
        Some((offset, segment))
    }

    /// Remove the lowest segment if it starts before `expected`
    pub fn next_stale(&mut self, expected: u64) -> Option<(u64, TcpSegment)> {
        match self.segments.keys().next() {
            Some(&offset) if offset < expected => self.next(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Payload bytes currently buffered
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.bytes = 0;
    }
}

impl Default for StreamQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_SEGMENTS, DEFAULT_QUEUE_BYTES)
    }
}
