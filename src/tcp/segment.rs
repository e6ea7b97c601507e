//! Owned TCP segment

use bytes::Bytes;

use crate::packet::{TcpFlags, TcpPacket};

/// A TCP segment retained past the capture callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub flags: TcpFlags,
    pub payload: Bytes,
}

impl TcpSegment {
    pub fn new(src_port: u16, dst_port: u16, seq: u32, flags: TcpFlags, payload: Bytes) -> Self {
        Self {
            src_port,
            dst_port,
            seq,
            flags,
            payload,
        }
    }

    /// Copy a segment out of a borrowed header view
    pub fn from_packet(packet: &TcpPacket<'_>) -> Self {
        Self {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
            seq: packet.seq(),
            flags: packet.flags(),
            payload: Bytes::copy_from_slice(packet.payload()),
        }
    }

    /// Sequence space consumed: payload plus one each for SYN and FIN
    pub fn seq_len(&self) -> u32 {
        self.payload.len() as u32 + u32::from(self.flags.syn()) + u32::from(self.flags.fin())
    }

    /// Drop the first `n` sequence numbers (SYN first, then payload)
    pub(crate) fn trim_front(mut self, mut n: u32) -> Self {
        if n > 0 && self.flags.syn() {
            self.flags = TcpFlags(self.flags.0 & !TcpFlags::SYN);
            self.seq = self.seq.wrapping_add(1);
            n -= 1;
        }
        let cut = (n as usize).min(self.payload.len());
        self.payload = self.payload.slice(cut..);
        self.seq = self.seq.wrapping_add(cut as u32);
        self
    }
}
