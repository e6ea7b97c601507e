//! Counters for capture, TCP stream and RTMP layers

/// Per-direction TCP stream counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Segments passed to the stream
    pub segments_added: u64,
    /// Segments dropped because their data was already delivered
    pub retransmitted: u64,
    /// Segments buffered ahead of a gap
    pub out_of_order: u64,
    /// Segments whose front overlapped delivered data and was trimmed
    pub trimmed: u64,
    /// Segments rejected because the queue was full
    pub queue_overflows: u64,
    /// Segments handed to the listener
    pub delivered_segments: u64,
    /// Payload bytes handed to the listener
    pub payload_bytes: u64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Frame pipeline counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames fed to the pipeline
    pub frames: u64,
    /// Bytes across all frames
    pub bytes: u64,
    /// Frames whose headers could not be interpreted
    pub truncated: u64,
    /// Frames not carrying IPv4
    pub non_ipv4: u64,
    /// IPv4 packets not carrying TCP
    pub non_tcp: u64,
    /// IPv4 fragments seen
    pub fragments: u64,
    /// Datagrams completed from fragments
    pub reassembled: u64,
    /// IPv4 fragments rejected by the reassembler
    pub reassembly_errors: u64,
    /// TCP segments handed to the TCP reassembler
    pub tcp_segments: u64,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// RTMP parser counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtmpStats {
    /// Bytes appended to the parser
    pub bytes_received: u64,
    /// Bytes dropped before the parser trusted a chunk boundary
    pub bytes_skipped: u64,
    /// Chunks parsed
    pub chunks: u64,
    /// Complete messages dispatched
    pub messages: u64,
    /// Audio and video messages
    pub media_messages: u64,
    /// AMF0 command and data messages
    pub amf_messages: u64,
    /// Full parser resets
    pub resets: u64,
}

impl RtmpStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another parser's counters into this one
    pub fn merge(&mut self, other: &RtmpStats) {
        self.bytes_received += other.bytes_received;
        self.bytes_skipped += other.bytes_skipped;
        self.chunks += other.chunks;
        self.messages += other.messages;
        self.media_messages += other.media_messages;
        self.amf_messages += other.amf_messages;
        self.resets += other.resets;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtmp_stats_merge() {
        let mut total = RtmpStats::new();
        let one = RtmpStats {
            bytes_received: 100,
            messages: 3,
            resets: 1,
            ..Default::default()
        };
        total.merge(&one);
        total.merge(&one);
        assert_eq!(total.bytes_received, 200);
        assert_eq!(total.messages, 6);
        assert_eq!(total.resets, 2);
        assert_eq!(total.chunks, 0);
    }
}
