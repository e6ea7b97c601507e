//! Statistics and metrics
//!
//! Counters for each reconstruction layer. All counters are plain
//! integers updated by the single thread driving the pipeline.

pub mod metrics;

pub use metrics::{CaptureStats, RtmpStats, StreamStats};
