//! RTMP parser for one direction of a captured flow
//!
//! The parser is fed the ordered byte stream of one TCP direction in
//! arbitrary pieces. It buffers input, cuts it into chunks using each
//! chunk stream's sticky header state, reassembles messages that span
//! several chunks, and dispatches complete messages to an
//! [`RtmpHandler`].
//!
//! Chunk boundaries cannot be recovered inside a stream, so any framing
//! or AMF error discards all state. The parser then waits for input that
//! starts with a plausible type 0 header before trusting chunk headers
//! again; the same rule applies when attaching to a flow mid-stream.

use bytes::{Buf, BytesMut};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::chunk::{peek_basic_header, RtmpPacketHeader};
use super::config::RtmpConfig;
use super::constants::*;
use super::handler::{FlowContext, RtmpHandler};
use super::message::{RtmpMessage, UserControlEvent};
use super::stream::RtmpStream;
use crate::amf::Amf0Decoder;
use crate::error::{AmfError, Error, ProtocolError, Result};
use crate::stats::RtmpStats;

pub struct RtmpParser {
    config: RtmpConfig,
    ctx: FlowContext,
    buffer: BytesMut,
    streams: HashMap<u32, RtmpStream>,
    /// Incoming chunk size for this direction
    chunk_size: u32,
    /// Handshake bytes still to skip
    handshake_remaining: usize,
    /// Whether chunk headers in the buffer are trusted
    got_start: bool,
    stats: RtmpStats,
}

impl RtmpParser {
    /// Create a parser for one flow direction
    ///
    /// `from_start` tells whether the flow was captured from its SYN, in
    /// which case the handshake is expected first. Otherwise input is
    /// discarded until a plausible message start is found.
    pub fn new(config: RtmpConfig, ctx: FlowContext, from_start: bool) -> Self {
        let handshake_remaining = if from_start && config.skip_handshake {
            HANDSHAKE_LEN
        } else {
            0
        };
        Self {
            chunk_size: config.initial_chunk_size,
            config,
            ctx,
            buffer: BytesMut::new(),
            streams: HashMap::new(),
            handshake_remaining,
            got_start: from_start,
            stats: RtmpStats::default(),
        }
    }

    /// Feed the next piece of the byte stream
    pub fn append<H: RtmpHandler + ?Sized>(&mut self, payload: &[u8], handler: &mut H) {
        if payload.is_empty() {
            return;
        }
        self.stats.bytes_received += payload.len() as u64;
        let payload = self.skip_handshake(payload);
        if payload.is_empty() {
            return;
        }

        if !self.got_start {
            if !self.looks_like_start(payload) {
                self.stats.bytes_skipped += payload.len() as u64;
                tracing::trace!(flow = %self.ctx, len = payload.len(), "Waiting for message start");
                return;
            }
            tracing::debug!(flow = %self.ctx, "Found message start");
            self.got_start = true;
        }

        self.buffer.extend_from_slice(payload);
        self.process(handler);
    }

    fn skip_handshake<'a>(&mut self, payload: &'a [u8]) -> &'a [u8] {
        if self.handshake_remaining == 0 {
            return payload;
        }
        if self.handshake_remaining == HANDSHAKE_LEN && payload[0] != RTMP_VERSION {
            tracing::debug!(flow = %self.ctx, version = payload[0], "No handshake at flow start");
            self.handshake_remaining = 0;
            self.got_start = false;
            return payload;
        }

        let n = self.handshake_remaining.min(payload.len());
        self.handshake_remaining -= n;
        self.stats.bytes_skipped += n as u64;
        if self.handshake_remaining == 0 {
            tracing::debug!(flow = %self.ctx, "Handshake skipped");
        }
        &payload[n..]
    }

    /// Type 0 header with a message length inside the start bounds
    fn looks_like_start(&self, buf: &[u8]) -> bool {
        match RtmpPacketHeader::parse(buf, false) {
            Some(header) if header.chunk_type == CHUNK_FMT_0 => header.length.is_some_and(|len| {
                (self.config.start_min_len..=self.config.start_max_len).contains(&len)
            }),
            _ => false,
        }
    }

    fn process<H: RtmpHandler + ?Sized>(&mut self, handler: &mut H) {
        loop {
            let message = match self.next_message(handler) {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(e) => {
                    self.reset(e, handler);
                    break;
                }
            };
            if let Err(e) = self.dispatch(message, handler) {
                self.reset(e, handler);
                break;
            }
        }
    }

    /// Consume chunks until one completes a message
    ///
    /// Returns `Ok(None)` when the buffered input ends inside a chunk;
    /// that chunk is left untouched for the next call.
    fn next_message<H: RtmpHandler + ?Sized>(&mut self, handler: &mut H) -> Result<Option<RtmpMessage>> {
        loop {
            let Some((fmt, csid, _)) = peek_basic_header(&self.buffer) else {
                return Ok(None);
            };
            let stream = self.streams.get(&csid);
            if stream.is_none() && fmt != CHUNK_FMT_0 {
                return Err(ProtocolError::InvalidChunkHeader.into());
            }

            let type3_extended = stream.is_some_and(RtmpStream::extended_timestamp);
            let Some(header) = RtmpPacketHeader::parse(&self.buffer, type3_extended) else {
                return Ok(None);
            };

            let continuation = fmt == CHUNK_FMT_3 && stream.is_some_and(RtmpStream::in_message);
            let remaining = match stream {
                Some(s) if continuation => s.remaining(),
                Some(s) => header.length.unwrap_or(s.last_payload_size()),
                None => header.length.unwrap_or(0),
            };
            if remaining > self.config.max_message_size {
                return Err(ProtocolError::MessageTooLarge {
                    size: remaining,
                    max: self.config.max_message_size,
                }
                .into());
            }

            let data_len = remaining.min(self.chunk_size) as usize;
            if self.buffer.len() < header.len + data_len {
                return Ok(None);
            }

            self.buffer.advance(header.len);
            let data = self.buffer.split_to(data_len);
            self.stats.chunks += 1;

            let stream = match self.streams.entry(csid) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    tracing::debug!(flow = %self.ctx, csid, "New chunk stream");
                    handler.on_rtmp_new_stream(&self.ctx, csid);
                    entry.insert(RtmpStream::new(csid))
                }
            };
            if let Some(message) = stream.push_chunk(&header, continuation, &data) {
                return Ok(Some(message));
            }
        }
    }

    fn dispatch<H: RtmpHandler + ?Sized>(&mut self, message: RtmpMessage, handler: &mut H) -> Result<()> {
        self.stats.messages += 1;
        tracing::trace!(
            flow = %self.ctx,
            csid = message.csid,
            type_id = message.type_id,
            size = message.payload.len(),
            "Message"
        );

        match message.type_id {
            MSG_SET_CHUNK_SIZE => {
                let size = message.set_chunk_size().unwrap_or(0);
                if size == 0 || size > MAX_CHUNK_SIZE {
                    return Err(ProtocolError::InvalidChunkSize(size).into());
                }
                tracing::debug!(flow = %self.ctx, size, "Chunk size changed");
                self.chunk_size = size;
            }
            MSG_ABORT => {
                if let Some(stream) = message.abort_csid().and_then(|id| self.streams.get_mut(&id)) {
                    stream.abort();
                }
            }
            MSG_USER_CONTROL => match message.user_control() {
                Some(UserControlEvent::StreamBegin(id)) => handler.on_rtmp_stream_start(&self.ctx, id),
                Some(UserControlEvent::StreamEof(id)) | Some(UserControlEvent::StreamDry(id)) => {
                    handler.on_rtmp_stream_end(&self.ctx, id)
                }
                _ => {}
            },
            MSG_COMMAND_AMF0 | MSG_DATA_AMF0 => {
                self.stats.amf_messages += 1;
                let result = Amf0Decoder::new(&message.payload).decode_lenient();
                handler.on_rtmp_amf(&self.ctx, &message, &result);
                if result.got_errors {
                    return Err(result.error.unwrap_or(AmfError::UnexpectedEof).into());
                }
            }
            MSG_ACKNOWLEDGEMENT | MSG_WINDOW_ACK_SIZE | MSG_SET_PEER_BANDWIDTH => {}
            _ => {
                if message.is_media() {
                    self.stats.media_messages += 1;
                } else if message.is_amf3() || message.is_aggregate() {
                    tracing::trace!(flow = %self.ctx, type_id = message.type_id, "Passing through undecoded");
                }
                handler.on_rtmp_data(&self.ctx, &message);
            }
        }
        Ok(())
    }

    /// Discard all buffered input and chunk stream state
    ///
    /// The negotiated chunk size is kept.
    fn reset<H: RtmpHandler + ?Sized>(&mut self, reason: Error, handler: &mut H) {
        tracing::debug!(
            flow = %self.ctx,
            error = %reason,
            discarded = self.buffer.len(),
            "Parser reset"
        );
        self.stats.resets += 1;
        self.stats.bytes_skipped += self.buffer.len() as u64;
        self.buffer.clear();
        self.streams.clear();
        self.got_start = false;
        handler.on_rtmp_reset(&self.ctx, &reason);
    }

    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    /// Current incoming chunk size
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Whether chunk headers are currently trusted
    pub fn got_start(&self) -> bool {
        self.got_start
    }

    /// Bytes buffered but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stream(&self, csid: u32) -> Option<&RtmpStream> {
        self.streams.get(&csid)
    }

    pub fn stats(&self) -> &RtmpStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::{amf0, AmfProperty, AmfResult, AmfValue};
    use crate::rtmp::chunk::ChunkEncoder;
    use crate::tcp::{Direction, TcpConId};
    use bytes::Bytes;

    #[derive(Debug, PartialEq)]
    enum Event {
        NewStream(u32),
        Start(u32),
        End(u32),
        Data(u8, usize, u32),
        Amf(Option<String>, usize, bool),
        Reset,
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        reasons: Vec<String>,
    }

    impl RtmpHandler for Recorder {
        fn on_rtmp_new_stream(&mut self, _ctx: &FlowContext, csid: u32) {
            self.events.push(Event::NewStream(csid));
        }

        fn on_rtmp_stream_start(&mut self, _ctx: &FlowContext, message_id: u32) {
            self.events.push(Event::Start(message_id));
        }

        fn on_rtmp_stream_end(&mut self, _ctx: &FlowContext, message_id: u32) {
            self.events.push(Event::End(message_id));
        }

        fn on_rtmp_data(&mut self, _ctx: &FlowContext, message: &RtmpMessage) {
            self.events
                .push(Event::Data(message.type_id, message.payload.len(), message.timestamp));
        }

        fn on_rtmp_amf(&mut self, _ctx: &FlowContext, _message: &RtmpMessage, result: &AmfResult) {
            self.events.push(Event::Amf(
                result.name().map(str::to_string),
                result.values.len(),
                result.got_errors,
            ));
        }

        fn on_rtmp_reset(&mut self, _ctx: &FlowContext, reason: &Error) {
            self.events.push(Event::Reset);
            self.reasons.push(reason.to_string());
        }
    }

    fn ctx() -> FlowContext {
        FlowContext::new(TcpConId::new(50000, 1935), Direction::Forward)
    }

    fn parser(from_start: bool) -> RtmpParser {
        RtmpParser::new(RtmpConfig::default().skip_handshake(false), ctx(), from_start)
    }

    fn connect() -> RtmpMessage {
        let payload = amf0::encode_all(&[
            AmfValue::from("connect"),
            AmfValue::Number(1.0),
            AmfValue::Object(vec![
                AmfProperty::new("app", "live"),
                AmfProperty::new("tcUrl", "rtmp://localhost/live"),
            ]),
        ]);
        RtmpMessage::new(CSID_COMMAND, 0, MSG_COMMAND_AMF0, 0, payload)
    }

    fn audio(timestamp: u32, len: usize) -> RtmpMessage {
        RtmpMessage::new(CSID_AUDIO, timestamp, MSG_AUDIO, 1, Bytes::from(vec![0xAF; len]))
    }

    fn encode(encoder: &mut ChunkEncoder, messages: &[RtmpMessage]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for message in messages {
            encoder.encode(message, &mut buf);
        }
        buf.to_vec()
    }

    #[test]
    fn test_handshake_then_messages_in_small_pieces() {
        let mut wire = vec![RTMP_VERSION];
        wire.extend_from_slice(&[0u8; 2 * HANDSHAKE_SIZE]);
        wire.extend(encode(
            &mut ChunkEncoder::new(),
            &[connect(), audio(0, 300), audio(23, 300)],
        ));

        let mut parser = RtmpParser::new(RtmpConfig::default(), ctx(), true);
        let mut recorder = Recorder::default();
        for piece in wire.chunks(7) {
            parser.append(piece, &mut recorder);
        }

        assert_eq!(
            recorder.events,
            vec![
                Event::NewStream(CSID_COMMAND),
                Event::Amf(Some("connect".into()), 3, false),
                Event::NewStream(CSID_AUDIO),
                Event::Data(MSG_AUDIO, 300, 0),
                Event::Data(MSG_AUDIO, 300, 23),
            ]
        );
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.stats().bytes_skipped, HANDSHAKE_LEN as u64);
        assert_eq!(parser.stats().media_messages, 2);
        assert_eq!(parser.stats().amf_messages, 1);
    }

    #[test]
    fn test_control_consumed_and_other_types_passed_through() {
        let control = |type_id| {
            RtmpMessage::new(CSID_PROTOCOL_CONTROL, 0, type_id, 0, Bytes::from_static(&[0, 0, 0x10, 0, 2]))
        };
        let wire = encode(
            &mut ChunkEncoder::new(),
            &[
                control(MSG_ACKNOWLEDGEMENT),
                control(MSG_WINDOW_ACK_SIZE),
                control(MSG_SET_PEER_BANDWIDTH),
                RtmpMessage::new(CSID_COMMAND, 0, MSG_COMMAND_AMF3, 0, Bytes::from_static(&[0, 2, 0, 1, b'x'])),
                RtmpMessage::new(CSID_VIDEO, 0, MSG_AGGREGATE, 1, Bytes::from(vec![9u8; 20])),
            ],
        );

        let mut parser = parser(true);
        let mut recorder = Recorder::default();
        parser.append(&wire, &mut recorder);

        let data: Vec<_> = recorder
            .events
            .iter()
            .filter(|e| matches!(e, Event::Data(..)))
            .collect();
        assert_eq!(
            data,
            vec![&Event::Data(MSG_COMMAND_AMF3, 5, 0), &Event::Data(MSG_AGGREGATE, 20, 0)]
        );
        assert_eq!(parser.stats().messages, 5);
        assert_eq!(parser.stats().media_messages, 0);
        assert!(!recorder.events.contains(&Event::Reset));
    }

    #[test]
    fn test_incomplete_chunk_leaves_state_untouched() {
        let wire = encode(&mut ChunkEncoder::new(), &[audio(5, 40)]);
        let mut parser = parser(true);
        let mut recorder = Recorder::default();

        parser.append(&wire[..wire.len() - 1], &mut recorder);
        assert!(parser.stream(CSID_AUDIO).is_none());
        assert_eq!(parser.buffered(), wire.len() - 1);
        assert!(recorder.events.is_empty());

        parser.append(&wire[wire.len() - 1..], &mut recorder);
        assert_eq!(recorder.events.last(), Some(&Event::Data(MSG_AUDIO, 40, 5)));
        assert_eq!(parser.stats().chunks, 1);
    }

    #[test]
    fn test_set_chunk_size() {
        let mut encoder = ChunkEncoder::new();
        let set = RtmpMessage::new(
            CSID_PROTOCOL_CONTROL,
            0,
            MSG_SET_CHUNK_SIZE,
            0,
            Bytes::copy_from_slice(&4096u32.to_be_bytes()),
        );
        let mut wire = encode(&mut encoder, &[set]);
        encoder.set_chunk_size(4096);
        let video = RtmpMessage::new(CSID_VIDEO, 0, MSG_VIDEO, 1, Bytes::from(vec![0x17; 1000]));
        wire.extend(encode(&mut encoder, &[video]));

        let mut parser = parser(true);
        let mut recorder = Recorder::default();
        parser.append(&wire, &mut recorder);

        assert_eq!(parser.chunk_size(), 4096);
        assert_eq!(recorder.events.last(), Some(&Event::Data(MSG_VIDEO, 1000, 0)));
        // Set Chunk Size is consumed, one chunk for the video
        assert_eq!(parser.stats().chunks, 2);
    }

    #[test]
    fn test_invalid_chunk_size_resets() {
        let set = RtmpMessage::new(
            CSID_PROTOCOL_CONTROL,
            0,
            MSG_SET_CHUNK_SIZE,
            0,
            Bytes::from_static(&[0, 0, 0, 0]),
        );
        let wire = encode(&mut ChunkEncoder::new(), &[set]);
        let mut parser = parser(true);
        let mut recorder = Recorder::default();
        parser.append(&wire, &mut recorder);

        assert_eq!(recorder.events.last(), Some(&Event::Reset));
        assert_eq!(parser.chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_amf_error_delivers_partial_then_resets() {
        let payload = Bytes::from_static(&[0x02, 0x00, 0x03, b'a', b'b', b'c', 0xFF]);
        let bad = RtmpMessage::new(CSID_COMMAND, 0, MSG_COMMAND_AMF0, 0, payload);
        let mut wire = encode(&mut ChunkEncoder::new(), &[bad]);
        // Trailing data in the same append is discarded with the state
        wire.extend(encode(&mut ChunkEncoder::new(), &[audio(0, 20)]));

        let mut parser = parser(true);
        let mut recorder = Recorder::default();
        parser.append(&wire, &mut recorder);

        assert_eq!(
            recorder.events,
            vec![
                Event::NewStream(CSID_COMMAND),
                Event::Amf(Some("abc".into()), 1, true),
                Event::Reset,
            ]
        );
        assert!(recorder.reasons[0].contains("0xff"));
        assert!(!parser.got_start());
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.stats().resets, 1);

        // Recovers on the next plausible message start
        parser.append(&encode(&mut ChunkEncoder::new(), &[audio(7, 20)]), &mut recorder);
        assert_eq!(recorder.events.last(), Some(&Event::Data(MSG_AUDIO, 20, 7)));
    }

    #[test]
    fn test_got_start_heuristic() {
        let mut parser = parser(false);
        let mut recorder = Recorder::default();

        // Continuation data from the middle of a message
        parser.append(&[0xC4, 1, 2, 3, 4, 5, 6, 7, 8, 9], &mut recorder);
        // Type 0 header announcing a message too short to be a start
        parser.append(&encode(&mut ChunkEncoder::new(), &[audio(0, 4)]), &mut recorder);
        assert!(!parser.got_start());
        assert!(recorder.events.is_empty());

        parser.append(&encode(&mut ChunkEncoder::new(), &[audio(0, 8)]), &mut recorder);
        assert!(parser.got_start());
        assert_eq!(recorder.events.last(), Some(&Event::Data(MSG_AUDIO, 8, 0)));
        assert_eq!(parser.stats().bytes_skipped, 10 + 12 + 4);

        // Too long to be a start
        let mut parser = self::parser(false);
        parser.append(&encode(&mut ChunkEncoder::new(), &[audio(0, 1441)]), &mut recorder);
        assert!(!parser.got_start());
    }

    #[test]
    fn test_oversized_message_resets() {
        let config = RtmpConfig::default().skip_handshake(false).max_message_size(100);
        let mut parser = RtmpParser::new(config, ctx(), true);
        let mut recorder = Recorder::default();
        parser.append(&encode(&mut ChunkEncoder::new(), &[audio(0, 500)]), &mut recorder);

        assert_eq!(recorder.events, vec![Event::Reset]);
        assert!(recorder.reasons[0].contains("too large"));
    }

    #[test]
    fn test_unknown_chunk_stream_resets() {
        let mut parser = parser(true);
        let mut recorder = Recorder::default();
        parser.append(&[0x44, 0, 0, 0, 0, 0, 1, 8, 0], &mut recorder);
        assert_eq!(recorder.events, vec![Event::Reset]);
    }

    #[test]
    fn test_user_control_stream_events() {
        let control = |event: u16| {
            let mut payload = event.to_be_bytes().to_vec();
            payload.extend_from_slice(&1u32.to_be_bytes());
            RtmpMessage::new(CSID_PROTOCOL_CONTROL, 0, MSG_USER_CONTROL, 0, Bytes::from(payload))
        };
        let wire = encode(
            &mut ChunkEncoder::new(),
            &[control(UC_STREAM_BEGIN), control(UC_STREAM_EOF), control(UC_STREAM_DRY)],
        );

        let mut parser = parser(true);
        let mut recorder = Recorder::default();
        parser.append(&wire, &mut recorder);
        assert_eq!(
            recorder.events,
            vec![
                Event::NewStream(CSID_PROTOCOL_CONTROL),
                Event::Start(1),
                Event::End(1),
                Event::End(1),
            ]
        );
    }

    #[test]
    fn test_extended_timestamp_message() {
        let ts = 0x0123_4567;
        let wire = encode(&mut ChunkEncoder::new(), &[audio(ts, 200)]);
        let mut parser = parser(true);
        let mut recorder = Recorder::default();
        parser.append(&wire, &mut recorder);
        assert_eq!(recorder.events.last(), Some(&Event::Data(MSG_AUDIO, 200, ts)));
    }

    #[test]
    fn test_abort_discards_partial() {
        let mut encoder = ChunkEncoder::new();
        let wire = encode(&mut encoder, &[audio(0, 200)]);
        let first_chunk = &wire[..12 + 128];

        let abort = RtmpMessage::new(
            CSID_PROTOCOL_CONTROL,
            0,
            MSG_ABORT,
            0,
            Bytes::copy_from_slice(&CSID_AUDIO.to_be_bytes()),
        );
        let abort_wire = encode(&mut ChunkEncoder::new(), &[abort]);

        let mut parser = parser(true);
        let mut recorder = Recorder::default();
        parser.append(first_chunk, &mut recorder);
        assert!(parser.stream(CSID_AUDIO).unwrap().in_message());
        parser.append(&abort_wire, &mut recorder);
        assert!(!parser.stream(CSID_AUDIO).unwrap().in_message());
        assert!(!recorder.events.iter().any(|e| matches!(e, Event::Data(..))));
    }
}
