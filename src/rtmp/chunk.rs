//! RTMP chunk headers
//!
//! ```text
//! +-------------+-----------------+--------------------+------------+
//! | Basic Header| Message Header  | Extended Timestamp | Chunk Data |
//! | (1-3 bytes) | (0,3,7,11 bytes)| (0 or 4 bytes)     |            |
//! +-------------+-----------------+--------------------+------------+
//!
//! Basic Header formats:
//! - 1 byte:  fmt(2) + csid(6)        for csid 2-63
//! - 2 bytes: fmt(2) + 0 + csid(8)    for csid 64-319
//! - 3 bytes: fmt(2) + 1 + csid(16)   for csid 64-65599
//!
//! Message Header formats (based on fmt):
//! - Type 0 (11 bytes): timestamp(3) + length(3) + type(1) + stream_id(4, LE)
//! - Type 1 (7 bytes):  timestamp_delta(3) + length(3) + type(1)
//! - Type 2 (3 bytes):  timestamp_delta(3)
//! - Type 3 (0 bytes):  (use previous chunk's values)
//! ```
//!
//! Parsing never consumes input: [`RtmpPacketHeader::parse`] returns
//! `None` until the whole header is buffered, and the caller decides
//! whether the chunk data behind it is complete before advancing.
//!
//! Reference: RTMP Specification Section 5.3

use bytes::{Buf, BufMut, BytesMut};
use std::collections::HashMap;

use super::constants::*;
use super::message::RtmpMessage;

/// Read the basic header: (fmt, csid, header length)
pub fn peek_basic_header(buf: &[u8]) -> Option<(u8, u32, usize)> {
    let first = *buf.first()?;
    let fmt = first >> 6;
    match first & 0x3F {
        0 => {
            let b1 = *buf.get(1)?;
            Some((fmt, 64 + u32::from(b1), 2))
        }
        1 => {
            let b1 = *buf.get(1)?;
            let b2 = *buf.get(2)?;
            Some((fmt, 64 + u32::from(b1) + u32::from(b2) * 256, 3))
        }
        csid => Some((fmt, u32::from(csid), 1)),
    }
}

/// Message header size implied by a chunk type
pub fn message_header_len(fmt: u8) -> usize {
    match fmt {
        CHUNK_FMT_0 => 11,
        CHUNK_FMT_1 => 7,
        CHUNK_FMT_2 => 3,
        _ => 0,
    }
}

/// One parsed chunk header
///
/// Fields the chunk type omits are `None`; they are filled in from the
/// chunk stream's sticky state by [`RtmpStream::update`].
///
/// [`RtmpStream::update`]: super::stream::RtmpStream::update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpPacketHeader {
    /// Chunk type (0-3)
    pub chunk_type: u8,
    /// Chunk stream id
    pub csid: u32,
    /// Absolute timestamp (type 0) or delta (types 1, 2), extended
    /// timestamp already applied
    pub timestamp: Option<u32>,
    /// Message length
    pub length: Option<u32>,
    /// Message type id
    pub type_id: Option<u8>,
    /// Message stream id
    pub message_id: Option<u32>,
    /// Whether a 4-byte extended timestamp follows the message header
    pub extended: bool,
    /// Total header bytes, basic header through extended timestamp
    pub len: usize,
}

impl RtmpPacketHeader {
    /// Parse a header at the start of `buf`
    ///
    /// `type3_extended` tells whether a type 3 chunk on this chunk stream
    /// carries an extended timestamp, which depends on the previous
    /// header. Returns `None` if the header is not fully buffered.
    pub fn parse(buf: &[u8], type3_extended: bool) -> Option<Self> {
        let (chunk_type, csid, basic_len) = peek_basic_header(buf)?;
        let msg_len = message_header_len(chunk_type);
        let mut fields = buf.get(basic_len..basic_len + msg_len)?;

        let mut header = Self {
            chunk_type,
            csid,
            timestamp: None,
            length: None,
            type_id: None,
            message_id: None,
            extended: false,
            len: basic_len + msg_len,
        };

        if chunk_type != CHUNK_FMT_3 {
            let ts = fields.get_uint(3) as u32;
            header.extended = ts == EXTENDED_TIMESTAMP_THRESHOLD;
            header.timestamp = Some(ts);
        } else {
            header.extended = type3_extended;
        }
        if chunk_type <= CHUNK_FMT_1 {
            header.length = Some(fields.get_uint(3) as u32);
            header.type_id = Some(fields.get_u8());
        }
        if chunk_type == CHUNK_FMT_0 {
            // message stream id is little-endian
            header.message_id = Some(fields.get_u32_le());
        }

        if header.extended {
            let mut ext = buf.get(header.len..header.len + 4)?;
            let ext = ext.get_u32();
            if chunk_type != CHUNK_FMT_3 {
                header.timestamp = Some(ext);
            }
            header.len += 4;
        }

        Some(header)
    }
}

/// Encoder-side sticky state per chunk stream
#[derive(Debug, Clone, Copy, Default)]
struct EncoderState {
    started: bool,
    timestamp: u32,
    timestamp_delta: u32,
    length: u32,
    type_id: u8,
    message_id: u32,
    extended: bool,
}

/// Chunk stream encoder
///
/// Splits messages into chunks and compresses headers against the
/// previous message on the same chunk stream. The capture path only
/// decodes; this produces traffic for tests and replay demos.
#[derive(Debug)]
pub struct ChunkEncoder {
    chunk_size: u32,
    streams: HashMap<u32, EncoderState>,
}

impl ChunkEncoder {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            streams: HashMap::new(),
        }
    }

    /// Set the outgoing chunk size (after sending Set Chunk Size)
    pub fn set_chunk_size(&mut self, size: u32) {
        self.chunk_size = size.clamp(1, MAX_CHUNK_SIZE);
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Encode a message into chunks
    pub fn encode(&mut self, message: &RtmpMessage, buf: &mut BytesMut) {
        let csid = message.csid;
        let chunk_size = self.chunk_size as usize;
        let state = self.streams.entry(csid).or_default();

        let payload_len = message.payload.len() as u32;
        let delta = message.timestamp.wrapping_sub(state.timestamp);
        let fmt = select_format(message, payload_len, delta, state);

        let value = if fmt == CHUNK_FMT_0 { message.timestamp } else { delta };
        let extended = value >= EXTENDED_TIMESTAMP_THRESHOLD;
        let field = value.min(EXTENDED_TIMESTAMP_THRESHOLD);

        *state = EncoderState {
            started: true,
            timestamp: message.timestamp,
            timestamp_delta: value,
            length: payload_len,
            type_id: message.type_id,
            message_id: message.message_id,
            extended: if fmt == CHUNK_FMT_3 { state.extended } else { extended },
        };
        let extended = state.extended;

        let mut offset = 0;
        let mut first = true;
        loop {
            let end = (offset + chunk_size).min(message.payload.len());
            write_basic_header(csid, if first { fmt } else { CHUNK_FMT_3 }, buf);

            if first {
                if fmt != CHUNK_FMT_3 {
                    write_u24(field, buf);
                }
                if fmt <= CHUNK_FMT_1 {
                    write_u24(payload_len, buf);
                    buf.put_u8(message.type_id);
                }
                if fmt == CHUNK_FMT_0 {
                    buf.put_u32_le(message.message_id);
                }
            }
            if extended {
                buf.put_u32(value);
            }

            buf.put_slice(&message.payload[offset..end]);
            offset = end;
            first = false;
            if offset >= message.payload.len() {
                break;
            }
        }
    }
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Select the most compact header for `message`
fn select_format(message: &RtmpMessage, length: u32, delta: u32, state: &EncoderState) -> u8 {
    if !state.started || message.message_id != state.message_id {
        return CHUNK_FMT_0;
    }
    if message.type_id != state.type_id || length != state.length {
        return CHUNK_FMT_1;
    }
    if delta == state.timestamp_delta {
        return CHUNK_FMT_3;
    }
    CHUNK_FMT_2
}

fn write_basic_header(csid: u32, fmt: u8, buf: &mut BytesMut) {
    if csid >= 64 + 256 {
        let rest = csid - 64;
        buf.put_u8((fmt << 6) | 1);
        buf.put_u8((rest & 0xFF) as u8);
        buf.put_u8(((rest >> 8) & 0xFF) as u8);
    } else if csid >= 64 {
        buf.put_u8(fmt << 6);
        buf.put_u8((csid - 64) as u8);
    } else {
        buf.put_u8((fmt << 6) | csid as u8);
    }
}

fn write_u24(value: u32, buf: &mut BytesMut) {
    buf.put_u8(((value >> 16) & 0xFF) as u8);
    buf.put_u8(((value >> 8) & 0xFF) as u8);
    buf.put_u8((value & 0xFF) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_basic_header_parsing() {
        assert_eq!(peek_basic_header(&[0x03]), Some((0, 3, 1)));
        assert_eq!(peek_basic_header(&[0xC4]), Some((3, 4, 1)));
        assert_eq!(peek_basic_header(&[0x00, 0x00]), Some((0, 64, 2)));
        assert_eq!(peek_basic_header(&[0x01, 0x00, 0x01]), Some((0, 320, 3)));
        assert_eq!(peek_basic_header(&[0x01, 0x00]), None);
        assert_eq!(peek_basic_header(&[]), None);
    }

    #[test]
    fn test_type0_header() {
        let buf = [
            0x03, // fmt 0, csid 3
            0x00, 0x03, 0xE8, // timestamp 1000
            0x00, 0x00, 0x20, // length 32
            0x14, // AMF0 command
            0x01, 0x00, 0x00, 0x00, // stream id 1 (LE)
        ];
        let header = RtmpPacketHeader::parse(&buf, false).unwrap();
        assert_eq!(header.chunk_type, 0);
        assert_eq!(header.csid, 3);
        assert_eq!(header.timestamp, Some(1000));
        assert_eq!(header.length, Some(32));
        assert_eq!(header.type_id, Some(MSG_COMMAND_AMF0));
        assert_eq!(header.message_id, Some(1));
        assert_eq!(header.len, 12);

        assert!(RtmpPacketHeader::parse(&buf[..11], false).is_none());
    }

    #[test]
    fn test_absent_fields() {
        let header = RtmpPacketHeader::parse(&[0x84, 0x00, 0x00, 0x21], false).unwrap();
        assert_eq!(header.chunk_type, 2);
        assert_eq!(header.timestamp, Some(33));
        assert_eq!(header.length, None);
        assert_eq!(header.type_id, None);
        assert_eq!(header.message_id, None);

        let header = RtmpPacketHeader::parse(&[0xC4], false).unwrap();
        assert_eq!(header.timestamp, None);
        assert_eq!(header.len, 1);
    }

    #[test]
    fn test_extended_timestamp() {
        let mut buf = vec![0x44, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x05, 0x08];
        buf.extend_from_slice(&0x0100_0000u32.to_be_bytes());
        let header = RtmpPacketHeader::parse(&buf, false).unwrap();
        assert!(header.extended);
        assert_eq!(header.timestamp, Some(0x0100_0000));
        assert_eq!(header.len, 12);
        assert!(RtmpPacketHeader::parse(&buf[..10], false).is_none());

        // Type 3 repeats the extended field when the previous header had one
        let header = RtmpPacketHeader::parse(&[0xC4, 0, 0, 0, 0], true).unwrap();
        assert!(header.extended);
        assert_eq!(header.len, 5);
    }

    #[test]
    fn test_encoder_splits_and_compresses() {
        let mut encoder = ChunkEncoder::new();
        let msg = RtmpMessage::new(CSID_VIDEO, 0, MSG_VIDEO, 1, Bytes::from(vec![7u8; 300]));
        let mut buf = BytesMut::new();
        encoder.encode(&msg, &mut buf);

        // 12-byte header, 128 bytes, 1 + 128, 1 + 44
        assert_eq!(buf.len(), 12 + 128 + 1 + 128 + 1 + 44);
        assert_eq!(buf[12 + 128], 0xC0 | CSID_VIDEO as u8);

        let next = RtmpMessage::new(CSID_VIDEO, 40, MSG_VIDEO, 1, Bytes::from(vec![1u8; 300]));
        let mut buf = BytesMut::new();
        encoder.encode(&next, &mut buf);
        let header = RtmpPacketHeader::parse(&buf, false).unwrap();
        assert_eq!(header.chunk_type, CHUNK_FMT_2);
        assert_eq!(header.timestamp, Some(40));
    }
}
