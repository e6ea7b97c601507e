//! Capture-side plumbing
//!
//! [`Pipeline`] turns raw frames into TCP reassembler input,
//! [`RtmpTap`] attaches an RTMP parser to each reassembled direction, and
//! [`driver`] runs a pipeline from an async frame channel.

pub mod config;
pub mod driver;
pub mod frame;
pub mod pipeline;
pub mod tap;

pub use config::TapConfig;
pub use driver::{frame_channel, run_frames};
pub use frame::RawFrame;
pub use pipeline::Pipeline;
pub use tap::RtmpTap;
