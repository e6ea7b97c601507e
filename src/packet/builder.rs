//! Packet builders
//!
//! Produce the wire layout the views read. Used to synthesize captures for
//! replay demos and tests; checksums are left zero since nothing on the
//! receive path validates them.

use super::ethernet::ETHERTYPE_IPV4;
use super::ipv4::{IPV4_MIN_HEADER_LEN, IP_PROTO_TCP};
use super::tcp::TCP_MIN_HEADER_LEN;

/// Wrap an IPv4 packet in an Ethernet II header
pub fn ethernet_frame(ip_packet: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + ip_packet.len());
    frame.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x02]);
    frame.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x01]);
    frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
    frame.extend_from_slice(ip_packet);
    frame
}

/// IPv4 header builder
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    src: [u8; 4],
    dst: [u8; 4],
    identification: u16,
    protocol: u8,
    fragment_offset: usize,
    more_fragments: bool,
    ttl: u8,
}

impl Ipv4Builder {
    pub fn new(src: [u8; 4], dst: [u8; 4]) -> Self {
        Self {
            src,
            dst,
            identification: 0,
            protocol: IP_PROTO_TCP,
            fragment_offset: 0,
            more_fragments: false,
            ttl: 64,
        }
    }

    pub fn identification(mut self, id: u16) -> Self {
        self.identification = id;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set fragment offset in bytes (must be a multiple of 8) and MF flag
    pub fn fragment(mut self, offset: usize, more_fragments: bool) -> Self {
        self.fragment_offset = offset;
        self.more_fragments = more_fragments;
        self
    }

    /// Build one packet carrying `payload`
    pub fn build(&self, payload: &[u8]) -> Vec<u8> {
        let total_len = IPV4_MIN_HEADER_LEN + payload.len();
        let mut buf = Vec::with_capacity(total_len);
        buf.push(0x45);
        buf.push(0);
        buf.extend_from_slice(&(total_len as u16).to_be_bytes());
        buf.extend_from_slice(&self.identification.to_be_bytes());
        let mut frag = ((self.fragment_offset / 8) as u16) & 0x1FFF;
        if self.more_fragments {
            frag |= 0x2000;
        }
        buf.extend_from_slice(&frag.to_be_bytes());
        buf.push(self.ttl);
        buf.push(self.protocol);
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&self.src);
        buf.extend_from_slice(&self.dst);
        buf.extend_from_slice(payload);
        buf
    }

    /// Split `datagram` into fragments carrying at most `max_payload` bytes
    ///
    /// `max_payload` is rounded down to a multiple of 8.
    pub fn build_fragments(&self, datagram: &[u8], max_payload: usize) -> Vec<Vec<u8>> {
        let step = (max_payload / 8).max(1) * 8;
        if datagram.len() <= step {
            return vec![self.clone().fragment(0, false).build(datagram)];
        }
        datagram
            .chunks(step)
            .enumerate()
            .map(|(i, piece)| {
                let offset = i * step;
                let more = offset + piece.len() < datagram.len();
                self.clone().fragment(offset, more).build(piece)
            })
            .collect()
    }
}

/// TCP header builder
#[derive(Debug, Clone)]
pub struct TcpBuilder {
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: u32,
    flags: u8,
    window: u16,
}

impl TcpBuilder {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        Self {
            src_port,
            dst_port,
            seq: 0,
            ack: 0,
            flags: 0,
            window: 65535,
        }
    }

    pub fn seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn ack(mut self, ack: u32) -> Self {
        self.ack = ack;
        self
    }

    /// Raw flag bits, e.g. `TcpFlags::SYN | TcpFlags::ACK`
    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn build(&self, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TCP_MIN_HEADER_LEN + payload.len());
        buf.extend_from_slice(&self.src_port.to_be_bytes());
        buf.extend_from_slice(&self.dst_port.to_be_bytes());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&self.ack.to_be_bytes());
        buf.push(((TCP_MIN_HEADER_LEN / 4) as u8) << 4);
        buf.push(self.flags);
        buf.extend_from_slice(&self.window.to_be_bytes());
        buf.extend_from_slice(&[0, 0, 0, 0]);
        buf.extend_from_slice(payload);
        buf
    }
}
