//! AMF (Action Message Format) implementation
//!
//! AMF0 is the binary serialization format RTMP uses for command
//! parameters and stream metadata. Only AMF0 is decoded; AMF3 messages
//! (types 15/17) are passed through as raw data.

pub mod amf0;
pub mod value;

pub use amf0::{Amf0Decoder, Amf0Encoder, AmfResult};
pub use value::{AmfProperty, AmfValue};
