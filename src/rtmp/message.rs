//! Reassembled RTMP messages
//!
//! RTMP messages are classified into:
//! - Protocol Control Messages (types 1-6): chunk/flow control
//! - Command and Data Messages (types 15, 17, 18, 20): AMF-encoded
//! - Audio/Video Messages (types 8, 9): media data
//!
//! Reference: RTMP Specification Section 5.4

use bytes::{Buf, Bytes};

use super::constants::*;

/// A complete message reassembled from one or more chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmpMessage {
    /// Chunk stream the message arrived on
    pub csid: u32,
    /// Absolute timestamp (milliseconds)
    pub timestamp: u32,
    /// Message type id
    pub type_id: u8,
    /// Message stream id
    pub message_id: u32,
    pub payload: Bytes,
}

impl RtmpMessage {
    pub fn new(csid: u32, timestamp: u32, type_id: u8, message_id: u32, payload: Bytes) -> Self {
        Self {
            csid,
            timestamp,
            type_id,
            message_id,
            payload,
        }
    }

    /// Protocol control message (types 1-6), consumed by the parser
    pub fn is_control(&self) -> bool {
        matches!(
            self.type_id,
            MSG_SET_CHUNK_SIZE
                | MSG_ABORT
                | MSG_ACKNOWLEDGEMENT
                | MSG_USER_CONTROL
                | MSG_WINDOW_ACK_SIZE
                | MSG_SET_PEER_BANDWIDTH
        )
    }

    pub fn is_media(&self) -> bool {
        matches!(self.type_id, MSG_AUDIO | MSG_VIDEO)
    }

    /// AMF0 command or data message
    pub fn is_amf0(&self) -> bool {
        matches!(self.type_id, MSG_COMMAND_AMF0 | MSG_DATA_AMF0)
    }

    /// AMF3 command or data message, passed through undecoded
    pub fn is_amf3(&self) -> bool {
        matches!(self.type_id, MSG_COMMAND_AMF3 | MSG_DATA_AMF3)
    }

    /// Aggregate of FLV-tagged audio/video/data sub-messages
    pub fn is_aggregate(&self) -> bool {
        self.type_id == MSG_AGGREGATE
    }

    /// Chunk size announced by a Set Chunk Size message
    pub fn set_chunk_size(&self) -> Option<u32> {
        if self.type_id != MSG_SET_CHUNK_SIZE || self.payload.len() < 4 {
            return None;
        }
        // Top bit is reserved
        Some((&self.payload[..]).get_u32() & 0x7FFF_FFFF)
    }

    /// Chunk stream named by an Abort message
    pub fn abort_csid(&self) -> Option<u32> {
        if self.type_id != MSG_ABORT || self.payload.len() < 4 {
            return None;
        }
        Some((&self.payload[..]).get_u32())
    }

    /// Event carried by a User Control message
    pub fn user_control(&self) -> Option<UserControlEvent> {
        if self.type_id != MSG_USER_CONTROL {
            return None;
        }
        UserControlEvent::parse(&self.payload)
    }
}

/// User Control event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserControlEvent {
    StreamBegin(u32),
    StreamEof(u32),
    StreamDry(u32),
    SetBufferLength { stream_id: u32, buffer_ms: u32 },
    StreamIsRecorded(u32),
    PingRequest(u32),
    PingResponse(u32),
    Unknown { event_type: u16, data: Bytes },
}

impl UserControlEvent {
    /// Parse an event; `None` if the payload is shorter than its type needs
    pub fn parse(payload: &Bytes) -> Option<Self> {
        if payload.len() < 2 {
            return None;
        }
        let mut buf = payload.clone();
        let event_type = buf.get_u16();

        let event = match event_type {
            UC_SET_BUFFER_LENGTH => {
                if buf.remaining() < 8 {
                    return None;
                }
                UserControlEvent::SetBufferLength {
                    stream_id: buf.get_u32(),
                    buffer_ms: buf.get_u32(),
                }
            }
            UC_STREAM_BEGIN | UC_STREAM_EOF | UC_STREAM_DRY | UC_STREAM_IS_RECORDED
            | UC_PING_REQUEST | UC_PING_RESPONSE => {
                if buf.remaining() < 4 {
                    return None;
                }
                let value = buf.get_u32();
                match event_type {
                    UC_STREAM_BEGIN => UserControlEvent::StreamBegin(value),
                    UC_STREAM_EOF => UserControlEvent::StreamEof(value),
                    UC_STREAM_DRY => UserControlEvent::StreamDry(value),
                    UC_STREAM_IS_RECORDED => UserControlEvent::StreamIsRecorded(value),
                    UC_PING_REQUEST => UserControlEvent::PingRequest(value),
                    _ => UserControlEvent::PingResponse(value),
                }
            }
            _ => UserControlEvent::Unknown {
                event_type,
                data: buf,
            },
        };
        Some(event)
    }
}
