//! TCP reassembly configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Out-of-order queue slots per stream direction
pub const DEFAULT_QUEUE_SEGMENTS: usize = 64;

/// Out-of-order queue bytes per stream direction (64 slots of 2 KiB)
pub const DEFAULT_QUEUE_BYTES: usize = 64 * 2048;

/// TCP reassembly options
#[derive(Debug, Clone)]
pub struct ReassemblyConfig {
    /// Pick up connections whose handshake was not captured
    pub track_running_connections: bool,

    /// Close connections with no segment for this long (capture time)
    pub idle_timeout: Option<Duration>,

    /// Minimum capture time between automatic idle sweeps
    pub sweep_interval: Duration,

    /// Maximum buffered out-of-order segments per direction
    pub queue_max_segments: usize,

    /// Maximum buffered out-of-order payload bytes per direction
    pub queue_max_bytes: usize,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            track_running_connections: false,
            idle_timeout: Some(Duration::from_secs(300)),
            sweep_interval: Duration::from_secs(10),
            queue_max_segments: DEFAULT_QUEUE_SEGMENTS,
            queue_max_bytes: DEFAULT_QUEUE_BYTES,
        }
    }
}

impl ReassemblyConfig {
    /// Enable or disable mid-stream connection pickup
    pub fn track_running_connections(mut self, enabled: bool) -> Self {
        self.track_running_connections = enabled;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Keep idle connections until FIN
    pub fn disable_idle_timeout(mut self) -> Self {
        self.idle_timeout = None;
        self
    }

    /// Set sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set out-of-order queue limits
    pub fn queue_limits(mut self, max_segments: usize, max_bytes: usize) -> Self {
        self.queue_max_segments = max_segments;
        self.queue_max_bytes = max_bytes;
        self
    }

    /// Reject configurations that could never buffer a segment
    pub fn validate(&self) -> Result<()> {
        if self.queue_max_segments == 0 || self.queue_max_bytes == 0 {
            return Err(Error::Config("queue limits must be non-zero".into()));
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(Error::Config("idle timeout must be non-zero".into()));
        }
        Ok(())
    }
}
