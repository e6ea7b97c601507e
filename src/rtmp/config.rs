//! RTMP parser configuration

use super::constants::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MAX_MESSAGE_SIZE};
use crate::error::{Error, Result};

/// Smallest first message accepted when attaching mid-stream
pub const DEFAULT_START_MIN_LEN: u32 = 8;

/// Largest first message accepted when attaching mid-stream
pub const DEFAULT_START_MAX_LEN: u32 = 1440;

/// RTMP parser options
#[derive(Debug, Clone)]
pub struct RtmpConfig {
    /// Messages announcing a larger length reset the parser
    pub max_message_size: u32,

    /// Message length bounds for the mid-stream start heuristic
    pub start_min_len: u32,
    pub start_max_len: u32,

    /// Chunk size assumed before any Set Chunk Size is seen
    pub initial_chunk_size: u32,

    /// Skip C0/C1/C2 (S0/S1/S2) on flows captured from their SYN
    pub skip_handshake: bool,
}

impl Default for RtmpConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            start_min_len: DEFAULT_START_MIN_LEN,
            start_max_len: DEFAULT_START_MAX_LEN,
            initial_chunk_size: DEFAULT_CHUNK_SIZE,
            skip_handshake: true,
        }
    }
}

impl RtmpConfig {
    pub fn max_message_size(mut self, size: u32) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the accepted first-message length range
    pub fn start_bounds(mut self, min: u32, max: u32) -> Self {
        self.start_min_len = min;
        self.start_max_len = max;
        self
    }

    /// Set the initial chunk size, e.g. when attaching after negotiation
    pub fn initial_chunk_size(mut self, size: u32) -> Self {
        self.initial_chunk_size = size;
        self
    }

    pub fn skip_handshake(mut self, enabled: bool) -> Self {
        self.skip_handshake = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_chunk_size == 0 || self.initial_chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::Config(format!(
                "chunk size {} out of range",
                self.initial_chunk_size
            )));
        }
        if self.start_min_len > self.start_max_len {
            return Err(Error::Config("start bounds inverted".into()));
        }
        Ok(())
    }
}
