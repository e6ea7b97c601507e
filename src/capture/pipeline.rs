//! Frame pipeline: Ethernet → IPv4 → TCP

use std::time::Duration;

use super::frame::RawFrame;
use crate::error::Result;
use crate::ip::{Ipv4Config, Ipv4Reassembler};
use crate::packet::{EthernetFrame, Ipv4Packet, TcpPacket, IP_PROTO_TCP};
use crate::stats::CaptureStats;
use crate::tcp::{ReassemblyConfig, TcpHandler, TcpReassembler};

/// Drives captured frames through defragmentation and TCP reassembly
///
/// Frames that are not IPv4/TCP or whose headers are truncated are
/// counted and skipped. Reassembly errors are returned to the caller;
/// the pipeline stays usable after them.
pub struct Pipeline<T: TcpHandler> {
    ip: Ipv4Reassembler,
    tcp: TcpReassembler<T>,
    stats: CaptureStats,
}

impl<T: TcpHandler> Pipeline<T> {
    pub fn new(ipv4: Ipv4Config, reassembly: ReassemblyConfig, handler: T) -> Self {
        Self {
            ip: Ipv4Reassembler::new(ipv4),
            tcp: TcpReassembler::new(reassembly, handler),
            stats: CaptureStats::default(),
        }
    }

    pub fn process(&mut self, frame: &RawFrame) -> Result<()> {
        self.process_frame(&frame.data, frame.timestamp)
    }

    /// Process one Ethernet frame
    pub fn process_frame(&mut self, frame: &[u8], timestamp: Duration) -> Result<()> {
        self.stats.frames += 1;
        self.stats.bytes += frame.len() as u64;

        let eth = match EthernetFrame::new_checked(frame) {
            Ok(eth) => eth,
            Err(e) => {
                self.stats.truncated += 1;
                tracing::trace!(error = %e, "Skipping frame");
                return Ok(());
            }
        };
        if !eth.is_ipv4() {
            self.stats.non_ipv4 += 1;
            return Ok(());
        }
        self.handle_ipv4(eth.payload(), timestamp)
    }

    /// Process one IPv4 packet without link-layer header
    pub fn process_ipv4(&mut self, packet: &[u8], timestamp: Duration) -> Result<()> {
        self.stats.frames += 1;
        self.stats.bytes += packet.len() as u64;
        self.handle_ipv4(packet, timestamp)
    }

    fn handle_ipv4(&mut self, data: &[u8], timestamp: Duration) -> Result<()> {
        let packet = match Ipv4Packet::new_checked(data) {
            Ok(packet) => packet,
            Err(e) => {
                self.stats.truncated += 1;
                tracing::trace!(error = %e, "Skipping IPv4 packet");
                return Ok(());
            }
        };
        if packet.protocol() != IP_PROTO_TCP {
            self.stats.non_tcp += 1;
            return Ok(());
        }

        let fragmented = packet.is_fragment();
        if fragmented {
            self.stats.fragments += 1;
        }
        let payload = match self.ip.add(packet) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(()),
            Err(e) => {
                self.stats.reassembly_errors += 1;
                tracing::warn!(
                    src = %packet.src_addr(),
                    id = packet.identification(),
                    error = %e,
                    "Fragment rejected"
                );
                return Err(e.into());
            }
        };
        if fragmented {
            self.stats.reassembled += 1;
        }

        let segment = match TcpPacket::new_checked(payload) {
            Ok(segment) => segment,
            Err(e) => {
                self.stats.truncated += 1;
                tracing::trace!(error = %e, "Skipping TCP segment");
                return Ok(());
            }
        };
        self.stats.tcp_segments += 1;
        self.tcp.add(&segment, timestamp)
    }

    /// Close all connections at end of capture
    pub fn finish(&mut self) -> usize {
        let closed = self.tcp.close_all();
        tracing::debug!(
            frames = self.stats.frames,
            segments = self.stats.tcp_segments,
            closed,
            "Capture finished"
        );
        closed
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn tcp(&self) -> &TcpReassembler<T> {
        &self.tcp
    }

    pub fn handler(&self) -> &T {
        self.tcp.handler()
    }

    pub fn handler_mut(&mut self) -> &mut T {
        self.tcp.handler_mut()
    }

    pub fn into_handler(self) -> T {
        self.tcp.into_handler()
    }
}
