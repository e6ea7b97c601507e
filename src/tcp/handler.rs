//! TCP reassembly callbacks

use std::fmt;

use super::conid::Direction;
use super::connection::TcpConnection;
use super::segment::TcpSegment;

/// Why a connection left the reassembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Delivery reached a FIN in either direction
    Fin,
    /// Delivery reached a RST in either direction
    Reset,
    /// No segment within the configured idle timeout
    IdleTimeout,
    /// Closed by [`TcpReassembler::close_all`](super::TcpReassembler::close_all)
    Shutdown,
    /// A SYN with a new initial sequence number reused the port pair
    PortReuse,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Fin => write!(f, "fin"),
            CloseReason::Reset => write!(f, "reset"),
            CloseReason::IdleTimeout => write!(f, "idle-timeout"),
            CloseReason::Shutdown => write!(f, "shutdown"),
            CloseReason::PortReuse => write!(f, "port-reuse"),
        }
    }
}

/// Receiver of connection lifecycle events and ordered stream data
///
/// Every method has a no-op default, so implementors only override what
/// they consume.
pub trait TcpHandler {
    /// A connection was created (on SYN, or on first sight when tracking
    /// running connections)
    fn on_tcp_new_connection(&mut self, _conn: &TcpConnection) {}

    /// The first segment of one direction was seen
    fn on_tcp_new_connection_stream(&mut self, _conn: &TcpConnection, _direction: Direction) {}

    /// The connection was removed; no further events follow for it
    fn on_tcp_closed_connection(&mut self, _conn: &TcpConnection, _reason: CloseReason) {}

    /// In-order, gap-free segments delivered by one `add` call
    fn on_tcp_data(&mut self, _conn: &TcpConnection, _direction: Direction, _segments: &[TcpSegment]) {}
}
