//! RTMP parser callbacks

use std::fmt;

use super::message::RtmpMessage;
use crate::amf::AmfResult;
use crate::error::Error;
use crate::tcp::{Direction, TcpConId};

/// The TCP flow a parser is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowContext {
    pub conn: TcpConId,
    pub direction: Direction,
}

impl FlowContext {
    pub fn new(conn: TcpConId, direction: Direction) -> Self {
        Self { conn, direction }
    }
}

impl fmt::Display for FlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.conn, self.direction)
    }
}

/// Receiver of decoded RTMP events
///
/// All methods have no-op defaults. Payloads are shared `Bytes`; clone
/// them to retain data past the callback.
pub trait RtmpHandler {
    /// First chunk seen on a chunk stream id
    fn on_rtmp_new_stream(&mut self, _ctx: &FlowContext, _csid: u32) {}

    /// User Control Stream Begin
    fn on_rtmp_stream_start(&mut self, _ctx: &FlowContext, _message_id: u32) {}

    /// User Control Stream EOF or Stream Dry
    fn on_rtmp_stream_end(&mut self, _ctx: &FlowContext, _message_id: u32) {}

    /// Audio, video and any other message not decoded as AMF0
    fn on_rtmp_data(&mut self, _ctx: &FlowContext, _message: &RtmpMessage) {}

    /// AMF0 command or data message, possibly partially decoded
    fn on_rtmp_amf(&mut self, _ctx: &FlowContext, _message: &RtmpMessage, _result: &AmfResult) {}

    /// All parser state was discarded after malformed input
    fn on_rtmp_reset(&mut self, _ctx: &FlowContext, _reason: &Error) {}
}

/// A handler that logs every event
#[derive(Debug, Default)]
pub struct LoggingHandler;

impl RtmpHandler for LoggingHandler {
    fn on_rtmp_new_stream(&mut self, ctx: &FlowContext, csid: u32) {
        tracing::debug!(flow = %ctx, csid, "New chunk stream");
    }

    fn on_rtmp_stream_start(&mut self, ctx: &FlowContext, message_id: u32) {
        tracing::info!(flow = %ctx, message_id, "Stream begin");
    }

    fn on_rtmp_stream_end(&mut self, ctx: &FlowContext, message_id: u32) {
        tracing::info!(flow = %ctx, message_id, "Stream end");
    }

    fn on_rtmp_data(&mut self, ctx: &FlowContext, message: &RtmpMessage) {
        tracing::debug!(
            flow = %ctx,
            type_id = message.type_id,
            timestamp = message.timestamp,
            size = message.payload.len(),
            "Message"
        );
    }

    fn on_rtmp_amf(&mut self, ctx: &FlowContext, message: &RtmpMessage, result: &AmfResult) {
        tracing::info!(
            flow = %ctx,
            type_id = message.type_id,
            name = result.name().unwrap_or("<none>"),
            values = result.values.len(),
            partial = result.got_errors,
            "AMF message"
        );
    }

    fn on_rtmp_reset(&mut self, ctx: &FlowContext, reason: &Error) {
        tracing::warn!(flow = %ctx, error = %reason, "Parser reset");
    }
}
