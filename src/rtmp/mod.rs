//! RTMP chunk framing on top of a reassembled byte stream
//!
//! - [`chunk`]: chunk header parsing (and an encoder for building traffic)
//! - [`stream`]: per chunk stream sticky header state
//! - [`message`]: reassembled messages and control payloads
//! - [`parser`]: buffering, de-chunking and dispatch for one flow direction
//! - [`handler`]: callbacks receiving decoded events
//!
//! Reference: Adobe RTMP Specification (December 2012)

pub mod chunk;
pub mod config;
pub mod constants;
pub mod handler;
pub mod message;
pub mod parser;
pub mod stream;

pub use chunk::{ChunkEncoder, RtmpPacketHeader};
pub use config::RtmpConfig;
pub use handler::{FlowContext, LoggingHandler, RtmpHandler};
pub use message::{RtmpMessage, UserControlEvent};
pub use parser::RtmpParser;
pub use stream::RtmpStream;
