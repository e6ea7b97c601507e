//! IPv4 header view
//!
//! ```text
//!  0       4       8               16    19                      31
//! +-------+-------+---------------+-------------------------------+
//! |Version|  IHL  |      TOS      |          Total Length         |
//! +-------+-------+---------------+-----+-------------------------+
//! |        Identification         |Flags|     Fragment Offset     |
//! +---------------+---------------+-----+-------------------------+
//! |      TTL      |   Protocol    |        Header Checksum        |
//! +---------------+---------------+-------------------------------+
//! |                        Source Address                         |
//! |                      Destination Address                      |
//! +---------------------------------------------------------------+
//! ```
//!
//! IHL counts 4-byte words; the fragment offset counts 8-byte units.

use std::net::Ipv4Addr;

use super::read_u16;
use crate::error::PacketError;

/// IP protocol number for TCP
pub const IP_PROTO_TCP: u8 = 6;

/// Minimum IPv4 header length
pub const IPV4_MIN_HEADER_LEN: usize = 20;

const FLAG_DONT_FRAGMENT: u8 = 0x40;
const FLAG_MORE_FRAGMENTS: u8 = 0x20;

/// IPv4 packet over a borrowed buffer
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Packet<'a> {
    data: &'a [u8],
}

impl<'a> Ipv4Packet<'a> {
    /// Wrap without validation; accessors panic on a short buffer
    pub fn new_unchecked(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Wrap after checking version and header length against the buffer
    pub fn new_checked(data: &'a [u8]) -> Result<Self, PacketError> {
        if data.len() < IPV4_MIN_HEADER_LEN {
            return Err(PacketError::Truncated {
                needed: IPV4_MIN_HEADER_LEN,
                available: data.len(),
            });
        }
        let packet = Self { data };
        if packet.version() != 4 {
            return Err(PacketError::BadVersion(packet.version()));
        }
        let header_len = packet.header_len();
        if header_len < IPV4_MIN_HEADER_LEN || header_len > data.len() {
            return Err(PacketError::BadHeaderLength(header_len));
        }
        Ok(packet)
    }

    pub fn version(&self) -> u8 {
        self.data[0] >> 4
    }

    /// Header length in bytes
    pub fn header_len(&self) -> usize {
        ((self.data[0] & 0x0F) as usize) * 4
    }

    pub fn total_len(&self) -> usize {
        read_u16(self.data, 2) as usize
    }

    pub fn identification(&self) -> u16 {
        read_u16(self.data, 4)
    }

    pub fn dont_fragment(&self) -> bool {
        self.data[6] & FLAG_DONT_FRAGMENT != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.data[6] & FLAG_MORE_FRAGMENTS != 0
    }

    /// Fragment offset in bytes
    pub fn fragment_offset(&self) -> usize {
        ((read_u16(self.data, 6) & 0x1FFF) as usize) * 8
    }

    /// True when this packet is one piece of a larger datagram
    pub fn is_fragment(&self) -> bool {
        self.more_fragments() || self.fragment_offset() != 0
    }

    pub fn ttl(&self) -> u8 {
        self.data[8]
    }

    pub fn protocol(&self) -> u8 {
        self.data[9]
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.data[12], self.data[13], self.data[14], self.data[15])
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.data[16], self.data[17], self.data[18], self.data[19])
    }

    /// Payload after the header, clamped to the total length field
    ///
    /// Link-layer padding past `total_len` is excluded. A total length
    /// shorter than the header yields an empty payload.
    pub fn payload(&self) -> &'a [u8] {
        let start = self.header_len();
        let end = self.total_len().min(self.data.len());
        if end <= start {
            return &[];
        }
        &self.data[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::builder::Ipv4Builder;

    #[test]
    fn test_fields() {
        let raw = Ipv4Builder::new([10, 0, 0, 1], [10, 0, 0, 2])
            .identification(0x1234)
            .fragment(1400, true)
            .build(&[0xAA; 16]);

        let ip = Ipv4Packet::new_checked(&raw).unwrap();
        assert_eq!(ip.version(), 4);
        assert_eq!(ip.header_len(), 20);
        assert_eq!(ip.total_len(), 36);
        assert_eq!(ip.identification(), 0x1234);
        assert!(ip.more_fragments());
        assert!(!ip.dont_fragment());
        assert_eq!(ip.fragment_offset(), 1400);
        assert!(ip.is_fragment());
        assert_eq!(ip.protocol(), IP_PROTO_TCP);
        assert_eq!(ip.src_addr(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(ip.dst_addr(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(ip.payload(), &[0xAA; 16][..]);
    }

    #[test]
    fn test_payload_excludes_padding() {
        let mut raw = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2]).build(&[1, 2, 3]);
        raw.extend_from_slice(&[0u8; 20]);
        let ip = Ipv4Packet::new_checked(&raw).unwrap();
        assert_eq!(ip.payload(), &[1, 2, 3]);
        assert!(!ip.is_fragment());
    }

    #[test]
    fn test_checked_rejects_bad_headers() {
        let mut raw = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2]).build(&[]);
        raw[0] = 0x65;
        assert_eq!(
            Ipv4Packet::new_checked(&raw).unwrap_err(),
            PacketError::BadVersion(6)
        );

        raw[0] = 0x4F; // 60-byte header in a 20-byte buffer
        assert_eq!(
            Ipv4Packet::new_checked(&raw).unwrap_err(),
            PacketError::BadHeaderLength(60)
        );

        assert!(matches!(
            Ipv4Packet::new_checked(&raw[..12]),
            Err(PacketError::Truncated { .. })
        ));
    }
}
