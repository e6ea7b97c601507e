//! Per chunk stream sticky state
//!
//! Chunk headers omit every field unchanged since the previous chunk on
//! the same chunk stream. An [`RtmpStream`] remembers the last value of
//! each field and the partially received message body.

use bytes::{Bytes, BytesMut};

use super::chunk::RtmpPacketHeader;
use super::constants::CHUNK_FMT_0;
use super::message::RtmpMessage;

#[derive(Debug, Clone, Default)]
pub struct RtmpStream {
    csid: u32,
    timestamp: u32,
    timestamp_delta: u32,
    last_type_id: u8,
    last_payload_size: u32,
    last_message_id: u32,
    extended: bool,
    partial: BytesMut,
}

impl RtmpStream {
    pub fn new(csid: u32) -> Self {
        Self {
            csid,
            ..Default::default()
        }
    }

    /// Apply the fields present in `header`; absent fields keep their value
    ///
    /// A type 0 timestamp is absolute; types 1 and 2 carry a delta, and
    /// type 3 repeats the previous delta.
    pub fn update(&mut self, header: &RtmpPacketHeader) {
        match header.timestamp {
            Some(ts) if header.chunk_type == CHUNK_FMT_0 => {
                // A following type 3 header treats the absolute value as its delta
                self.timestamp = ts;
                self.timestamp_delta = ts;
            }
            Some(delta) => {
                self.timestamp_delta = delta;
                self.timestamp = self.timestamp.wrapping_add(delta);
            }
            None => self.timestamp = self.timestamp.wrapping_add(self.timestamp_delta),
        }
        if let Some(length) = header.length {
            self.last_payload_size = length;
        }
        if let Some(type_id) = header.type_id {
            self.last_type_id = type_id;
        }
        if let Some(message_id) = header.message_id {
            self.last_message_id = message_id;
        }
        if header.timestamp.is_some() {
            self.extended = header.extended;
        }
    }

    /// Whether a message body is partially received
    pub fn in_message(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Bytes still missing from the current message
    pub fn remaining(&self) -> u32 {
        self.last_payload_size
            .saturating_sub(self.partial.len() as u32)
    }

    /// Add one chunk's data, returning the message once complete
    ///
    /// `continuation` is true for a type 3 chunk that continues the
    /// partially received message; otherwise `header` starts a new one.
    pub(crate) fn push_chunk(
        &mut self,
        header: &RtmpPacketHeader,
        continuation: bool,
        data: &[u8],
    ) -> Option<RtmpMessage> {
        if !continuation {
            if self.in_message() {
                tracing::trace!(
                    csid = self.csid,
                    discarded = self.partial.len(),
                    "New message before previous completed"
                );
                self.partial.clear();
            }
            self.update(header);
        }
        self.partial.extend_from_slice(data);

        if self.partial.len() as u32 >= self.last_payload_size {
            let payload: Bytes = self.partial.split().freeze();
            return Some(RtmpMessage::new(
                self.csid,
                self.timestamp,
                self.last_type_id,
                self.last_message_id,
                payload,
            ));
        }
        None
    }

    /// Drop the partially received message (Abort)
    pub fn abort(&mut self) {
        self.partial.clear();
    }

    pub fn csid(&self) -> u32 {
        self.csid
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn last_type_id(&self) -> u8 {
        self.last_type_id
    }

    pub fn last_payload_size(&self) -> u32 {
        self.last_payload_size
    }

    pub fn last_message_id(&self) -> u32 {
        self.last_message_id
    }

    /// Whether the last timestamp-bearing header used an extended timestamp
    pub fn extended_timestamp(&self) -> bool {
        self.extended
    }
}
