//! rtmp-tap: passive RTMP reconstruction from captured traffic
//!
//! This library rebuilds RTMP sessions from raw link-layer frames with no
//! ability to request retransmission:
//! - Zero-copy Ethernet/IPv4/TCP header views
//! - IPv4 fragment reassembly
//! - TCP stream reassembly with connection tracking (out-of-order,
//!   retransmitted and overlapping segments)
//! - RTMP chunk de-framing with sticky headers and chunk-size tracking
//! - Lenient AMF0 decoding that keeps partial results
//!
//! # Example: Replaying frames
//!
//! ```no_run
//! use rtmp_tap::{AmfResult, FlowContext, RtmpHandler, RtmpMessage, RtmpTap, TapConfig};
//! use std::time::Duration;
//!
//! struct Commands;
//!
//! impl RtmpHandler for Commands {
//!     fn on_rtmp_amf(&mut self, ctx: &FlowContext, _msg: &RtmpMessage, result: &AmfResult) {
//!         println!("{}: {:?}", ctx, result.name());
//!     }
//! }
//!
//! fn main() -> rtmp_tap::Result<()> {
//!     let mut pipeline = RtmpTap::pipeline(TapConfig::default(), Commands)?;
//!     let frames: Vec<(Vec<u8>, Duration)> = Vec::new();
//!     for (data, timestamp) in &frames {
//!         pipeline.process_frame(data, *timestamp)?;
//!     }
//!     pipeline.finish();
//!     Ok(())
//! }
//! ```

pub mod amf;
pub mod capture;
pub mod error;
pub mod ip;
pub mod packet;
pub mod rtmp;
pub mod stats;
pub mod tcp;

// Re-export main types for convenience
pub use amf::{AmfResult, AmfValue};
pub use capture::{Pipeline, RawFrame, RtmpTap, TapConfig};
pub use error::{Error, Result};
pub use rtmp::{FlowContext, RtmpConfig, RtmpHandler, RtmpMessage, RtmpParser};
pub use tcp::{ReassemblyConfig, TcpConId, TcpHandler, TcpReassembler};
