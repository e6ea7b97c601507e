//! Captured link-layer frames

use bytes::Bytes;
use std::time::Duration;

/// One frame as delivered by a capture source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame bytes starting at the Ethernet header
    pub data: Bytes,
    /// Capture timestamp, relative to any fixed origin
    pub timestamp: Duration,
}

impl RawFrame {
    pub fn new(data: impl Into<Bytes>, timestamp: Duration) -> Self {
        Self {
            data: data.into(),
            timestamp,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
