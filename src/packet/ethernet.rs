//! Ethernet II frame view

use super::read_u16;
use crate::error::PacketError;

/// EtherType for IPv4
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// Ethernet II header length (no VLAN tag)
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Ethernet II frame over a borrowed buffer
#[derive(Debug, Clone, Copy)]
pub struct EthernetFrame<'a> {
    data: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    /// Wrap without validation; accessors panic on a short buffer
    pub fn new_unchecked(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Wrap after checking the buffer holds a full header
    pub fn new_checked(data: &'a [u8]) -> Result<Self, PacketError> {
        if data.len() < ETHERNET_HEADER_LEN {
            return Err(PacketError::Truncated {
                needed: ETHERNET_HEADER_LEN,
                available: data.len(),
            });
        }
        Ok(Self { data })
    }

    pub fn destination(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.data[0..6]);
        mac
    }

    pub fn source(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.data[6..12]);
        mac
    }

    pub fn ethertype(&self) -> u16 {
        read_u16(self.data, 12)
    }

    pub fn is_ipv4(&self) -> bool {
        self.ethertype() == ETHERTYPE_IPV4
    }

    pub fn header_len(&self) -> usize {
        ETHERNET_HEADER_LEN
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.data[ETHERNET_HEADER_LEN..]
    }
}
