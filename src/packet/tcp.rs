//! TCP header view

use super::{read_u16, read_u32};
use crate::error::PacketError;

/// Minimum TCP header length
pub const TCP_MIN_HEADER_LEN: usize = 20;

/// TCP control flags (byte 13 of the header)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags(pub u8);

impl TcpFlags {
    pub const FIN: u8 = 1 << 0;
    pub const SYN: u8 = 1 << 1;
    pub const RST: u8 = 1 << 2;
    pub const PSH: u8 = 1 << 3;
    pub const ACK: u8 = 1 << 4;
    pub const URG: u8 = 1 << 5;

    pub fn fin(self) -> bool {
        self.0 & Self::FIN != 0
    }

    pub fn syn(self) -> bool {
        self.0 & Self::SYN != 0
    }

    pub fn rst(self) -> bool {
        self.0 & Self::RST != 0
    }

    pub fn psh(self) -> bool {
        self.0 & Self::PSH != 0
    }

    pub fn ack(self) -> bool {
        self.0 & Self::ACK != 0
    }

    pub fn urg(self) -> bool {
        self.0 & Self::URG != 0
    }
}

/// TCP segment over a borrowed buffer
#[derive(Debug, Clone, Copy)]
pub struct TcpPacket<'a> {
    data: &'a [u8],
}

impl<'a> TcpPacket<'a> {
    /// Wrap without validation; accessors panic on a short buffer
    pub fn new_unchecked(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Wrap after checking the data offset against the buffer
    pub fn new_checked(data: &'a [u8]) -> Result<Self, PacketError> {
        if data.len() < TCP_MIN_HEADER_LEN {
            return Err(PacketError::Truncated {
                needed: TCP_MIN_HEADER_LEN,
                available: data.len(),
            });
        }
        let packet = Self { data };
        let header_len = packet.header_len();
        if header_len < TCP_MIN_HEADER_LEN || header_len > data.len() {
            return Err(PacketError::BadHeaderLength(header_len));
        }
        Ok(packet)
    }

    pub fn src_port(&self) -> u16 {
        read_u16(self.data, 0)
    }

    pub fn dst_port(&self) -> u16 {
        read_u16(self.data, 2)
    }

    pub fn seq(&self) -> u32 {
        read_u32(self.data, 4)
    }

    pub fn ack(&self) -> u32 {
        read_u32(self.data, 8)
    }

    /// Header length in bytes (data offset × 4)
    pub fn header_len(&self) -> usize {
        ((self.data[12] >> 4) as usize) * 4
    }

    pub fn flags(&self) -> TcpFlags {
        TcpFlags(self.data[13] & 0x3F)
    }

    pub fn window(&self) -> u16 {
        read_u16(self.data, 14)
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.data[self.header_len()..]
    }
}
