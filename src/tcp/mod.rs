//! TCP stream reassembly
//!
//! Passive reconstruction of ordered byte streams from captured segments:
//!
//! - [`TcpReassembler`] demultiplexes segments to connections by a
//!   direction-independent port-pair identity and drives the
//!   connection lifecycle from SYN/FIN flags and an idle sweep.
//! - [`TcpConnection`] pairs the two directions of one connection.
//! - [`TcpStream`] orders one direction, dropping retransmissions and
//!   buffering segments that arrive ahead of a gap.
//! - [`StreamQueue`] is the bounded out-of-order buffer behind a stream.
//!
//! Nothing here acknowledges, validates checksums, or retransmits.

pub mod config;
pub mod conid;
pub mod connection;
pub mod handler;
pub mod queue;
pub mod reassembler;
pub mod segment;
pub mod stream;

pub use config::ReassemblyConfig;
pub use conid::{Direction, TcpConId};
pub use connection::TcpConnection;
pub use handler::{CloseReason, TcpHandler};
pub use queue::StreamQueue;
pub use reassembler::TcpReassembler;
pub use segment::TcpSegment;
pub use stream::TcpStream;
