//! Per-direction TCP stream ordering
//!
//! ```text
//!            seq == next                 seq > next
//!   segment ──────────────► deliver ◄── drain ◄── queue ◄────────── segment
//!      │                       ▲                                      
//!      │ seq + len <= next     │ seq < next < seq + len
//!      ▼                       │ (trim delivered prefix)
//!   retransmission ────────────┘
//! ```
//!
//! Sequence numbers are compared with 32-bit serial arithmetic. The
//! stream additionally counts an absolute offset that never wraps, which
//! keys the out-of-order queue.
//!
//! A FIN or RST marks where the stream ends. The stream only reports
//! itself ended once delivery has reached that point, so a FIN seen
//! ahead of a gap waits for the missing data.

use super::handler::CloseReason;
use super::queue::StreamQueue;
use super::segment::TcpSegment;
use crate::error::ReassemblyError;
use crate::stats::StreamStats;

/// One direction of a TCP connection
#[derive(Debug)]
pub struct TcpStream {
    src_port: u16,
    dst_port: u16,
    initial_seq: u32,
    /// Next expected sequence number
    next_seq: u32,
    /// Sequence space consumed since the stream was created
    next_offset: u64,
    queue: StreamQueue,
    /// Offset at which a FIN or RST ends the stream
    end: Option<(u64, CloseReason)>,
    stats: StreamStats,
}

impl TcpStream {
    /// Create a stream expecting `initial_seq` next
    pub fn new(src_port: u16, dst_port: u16, initial_seq: u32) -> Self {
        Self::with_queue(src_port, dst_port, initial_seq, StreamQueue::default())
    }

    pub fn with_queue(src_port: u16, dst_port: u16, initial_seq: u32, queue: StreamQueue) -> Self {
        Self {
            src_port,
            dst_port,
            initial_seq,
            next_seq: initial_seq,
            next_offset: 0,
            queue,
            end: None,
            stats: StreamStats::default(),
        }
    }

    /// Feed one segment, returning everything now deliverable in order
    ///
    /// Only segments carrying payload are returned; SYN and FIN advance
    /// the expected sequence number without producing output.
    pub fn add(&mut self, segment: TcpSegment) -> Result<Vec<TcpSegment>, ReassemblyError> {
        if segment.src_port != self.src_port || segment.dst_port != self.dst_port {
            return Err(ReassemblyError::PortMismatch {
                expected: (self.src_port, self.dst_port),
                actual: (segment.src_port, segment.dst_port),
            });
        }

        self.stats.segments_added += 1;
        let diff = segment.seq.wrapping_sub(self.next_seq) as i32;
        let offset = if diff >= 0 {
            self.next_offset + diff as u64
        } else {
            self.next_offset.saturating_sub(u64::from(diff.unsigned_abs()))
        };
        let seq_len = segment.seq_len();
        self.mark_end(&segment, offset, seq_len);

        if seq_len == 0 {
            // Pure ACK, window update or RST
            return Ok(Vec::new());
        }

        let mut delivered = Vec::new();
        if diff > 0 {
            return match self.queue.append(offset, segment) {
                Ok(true) => {
                    self.stats.out_of_order += 1;
                    tracing::trace!(
                        src = self.src_port,
                        offset,
                        pending = self.queue.len(),
                        "Buffered out-of-order segment"
                    );
                    self.drain(&mut delivered);
                    Ok(delivered)
                }
                Ok(false) => {
                    self.stats.retransmitted += 1;
                    Ok(delivered)
                }
                Err(e) => {
                    self.stats.queue_overflows += 1;
                    Err(e)
                }
            };
        }

        let behind = diff.unsigned_abs();
        if behind >= seq_len {
            self.stats.retransmitted += 1;
            tracing::trace!(src = self.src_port, seq = segment.seq, "Dropped retransmission");
            return Ok(delivered);
        }

        let segment = if behind > 0 {
            self.stats.trimmed += 1;
            segment.trim_front(behind)
        } else {
            segment
        };
        self.deliver(segment, &mut delivered);
        self.drain(&mut delivered);
        Ok(delivered)
    }

    fn mark_end(&mut self, segment: &TcpSegment, offset: u64, seq_len: u32) {
        let end = if segment.flags.fin() {
            (offset + u64::from(seq_len), CloseReason::Fin)
        } else if segment.flags.rst() {
            (offset, CloseReason::Reset)
        } else {
            return;
        };
        match self.end {
            Some((at, _)) if at <= end.0 => {}
            _ => {
                tracing::trace!(src = self.src_port, offset = end.0, reason = %end.1, "Stream end seen");
                self.end = Some(end);
            }
        }
    }

    /// Deliver queued segments that became contiguous
    fn drain(&mut self, delivered: &mut Vec<TcpSegment>) {
        loop {
            if self.queue.has_next(self.next_offset) {
                if let Some((_, segment)) = self.queue.next() {
                    self.deliver(segment, delivered);
                }
                continue;
            }

            // Queued segment overlapping data delivered since it was buffered
            let Some((offset, segment)) = self.queue.next_stale(self.next_offset) else {
                break;
            };
            let behind = (self.next_offset - offset) as u32;
            if behind >= segment.seq_len() {
                self.stats.retransmitted += 1;
            } else {
                self.stats.trimmed += 1;
                self.deliver(segment.trim_front(behind), delivered);
            }
        }
    }

    fn deliver(&mut self, segment: TcpSegment, delivered: &mut Vec<TcpSegment>) {
        let seq_len = segment.seq_len();
        self.next_seq = self.next_seq.wrapping_add(seq_len);
        self.next_offset += u64::from(seq_len);
        if !segment.payload.is_empty() {
            self.stats.delivered_segments += 1;
            self.stats.payload_bytes += segment.payload.len() as u64;
            delivered.push(segment);
        }
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    /// Sequence number the stream was opened with
    pub fn initial_seq(&self) -> u32 {
        self.initial_seq
    }

    /// FIN or RST that delivery has reached, if any
    pub fn ended(&self) -> Option<CloseReason> {
        self.end
            .filter(|(at, _)| self.next_offset >= *at)
            .map(|(_, reason)| reason)
    }

    /// Next expected sequence number
    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Segments waiting behind a gap
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}
