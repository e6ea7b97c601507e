//! Zero-copy wire header views
//!
//! Each view wraps a borrowed byte slice and reads header fields at fixed
//! offsets. `new_unchecked` trusts the caller to have validated the
//! length; `new_checked` does it and returns [`PacketError`] on short or
//! inconsistent headers. Payload accessors return slices of the same
//! buffer, so nothing is copied until a layer needs to retain data.
//!
//! ```text
//! Ethernet (14) | IPv4 (ihl*4) | TCP (data offset*4) | payload
//! ```
//!
//! [`PacketError`]: crate::error::PacketError

pub mod builder;
pub mod ethernet;
pub mod ipv4;
pub mod tcp;

pub use ethernet::{EthernetFrame, ETHERTYPE_IPV4};
pub use ipv4::{Ipv4Packet, IP_PROTO_TCP};
pub use tcp::{TcpFlags, TcpPacket};

/// Read a big-endian u16 at `offset`
#[inline]
pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Read a big-endian u32 at `offset`
#[inline]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
