//! Unified error types for rtmp-tap

use std::fmt;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all reconstruction layers
#[derive(Debug)]
pub enum Error {
    /// Wire header could not be interpreted
    Packet(PacketError),
    /// IPv4/TCP reassembly failure (contract violation or capacity)
    Reassembly(ReassemblyError),
    /// RTMP framing violation
    Protocol(ProtocolError),
    /// AMF decoding error
    Amf(AmfError),
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Packet(e) => write!(f, "Packet error: {}", e),
            Error::Reassembly(e) => write!(f, "Reassembly error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Amf(e) => write!(f, "AMF error: {}", e),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Packet(e) => Some(e),
            Error::Reassembly(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Amf(e) => Some(e),
            Error::Config(_) => None,
        }
    }
}

impl Error {
    /// True for errors that indicate caller misuse rather than noisy input
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::Reassembly(ReassemblyError::PortMismatch { .. })
                | Error::Reassembly(ReassemblyError::MisalignedFragment { .. })
        )
    }
}

impl From<PacketError> for Error {
    fn from(err: PacketError) -> Self {
        Error::Packet(err)
    }
}

impl From<ReassemblyError> for Error {
    fn from(err: ReassemblyError) -> Self {
        Error::Reassembly(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<AmfError> for Error {
    fn from(err: AmfError) -> Self {
        Error::Amf(err)
    }
}

/// Header view errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header
    Truncated { needed: usize, available: usize },
    /// Header length field smaller than the minimum or past the buffer end
    BadHeaderLength(usize),
    /// IP version field is not 4
    BadVersion(u8),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::Truncated { needed, available } => {
                write!(f, "Truncated header: need {} bytes, have {}", needed, available)
            }
            PacketError::BadHeaderLength(len) => write!(f, "Bad header length: {}", len),
            PacketError::BadVersion(v) => write!(f, "Bad IP version: {}", v),
        }
    }
}

impl std::error::Error for PacketError {}

/// IPv4 and TCP reassembly errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyError {
    /// Segment routed to a stream recorded for different ports
    PortMismatch {
        expected: (u16, u16),
        actual: (u16, u16),
    },
    /// Non-final fragment payload not a multiple of 8 bytes
    MisalignedFragment { offset: usize, len: usize },
    /// Fragment would extend past the maximum datagram size
    DatagramTooLarge { size: usize, max: usize },
    /// Out-of-order queue is at capacity
    QueueFull { segments: usize, bytes: usize },
}

impl fmt::Display for ReassemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReassemblyError::PortMismatch { expected, actual } => write!(
                f,
                "Port mismatch: stream {}->{} got segment {}->{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            ReassemblyError::MisalignedFragment { offset, len } => write!(
                f,
                "Misaligned fragment at offset {}: length {} not a multiple of 8",
                offset, len
            ),
            ReassemblyError::DatagramTooLarge { size, max } => {
                write!(f, "Datagram too large: {} bytes (max {})", size, max)
            }
            ReassemblyError::QueueFull { segments, bytes } => write!(
                f,
                "Stream queue full: {} segments, {} bytes pending",
                segments, bytes
            ),
        }
    }
}

impl std::error::Error for ReassemblyError {}

/// RTMP framing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    InvalidChunkHeader,
    MessageTooLarge { size: u32, max: u32 },
    InvalidChunkSize(u32),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::InvalidChunkHeader => write!(f, "Invalid chunk header"),
            ProtocolError::MessageTooLarge { size, max } => {
                write!(f, "Message too large: {} bytes (max {})", size, max)
            }
            ProtocolError::InvalidChunkSize(size) => write!(f, "Invalid chunk size: {}", size),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// AMF decoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmfError {
    UnknownMarker(u8),
    UnexpectedEof,
    InvalidUtf8,
    NestingTooDeep,
    InvalidObjectEnd,
}

impl fmt::Display for AmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmfError::UnknownMarker(m) => write!(f, "Unknown AMF marker: 0x{:02x}", m),
            AmfError::UnexpectedEof => write!(f, "Unexpected end of AMF data"),
            AmfError::InvalidUtf8 => write!(f, "Invalid UTF-8 in AMF string"),
            AmfError::NestingTooDeep => write!(f, "AMF nesting too deep"),
            AmfError::InvalidObjectEnd => write!(f, "Invalid object end marker"),
        }
    }
}

impl std::error::Error for AmfError {}
