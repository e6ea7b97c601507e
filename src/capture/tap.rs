//! Bridge from reassembled TCP streams to RTMP parsers

use std::collections::HashMap;

use super::config::TapConfig;
use super::pipeline::Pipeline;
use crate::error::Result;
use crate::rtmp::{FlowContext, RtmpConfig, RtmpHandler, RtmpParser};
use crate::stats::RtmpStats;
use crate::tcp::{CloseReason, Direction, TcpConnection, TcpHandler, TcpSegment};

/// A [`TcpHandler`] running one [`RtmpParser`] per connection direction
///
/// Connections outside the configured port filter are ignored.
pub struct RtmpTap<H: RtmpHandler> {
    rtmp_ports: Vec<u16>,
    config: RtmpConfig,
    parsers: HashMap<FlowContext, RtmpParser>,
    handler: H,
    closed: RtmpStats,
}

impl<H: RtmpHandler> RtmpTap<H> {
    pub fn new(config: &TapConfig, handler: H) -> Self {
        Self {
            rtmp_ports: config.rtmp_ports.clone(),
            config: config.rtmp.clone(),
            parsers: HashMap::new(),
            handler,
            closed: RtmpStats::default(),
        }
    }

    /// Build a frame pipeline feeding a new tap
    pub fn pipeline(config: TapConfig, handler: H) -> Result<Pipeline<Self>> {
        config.validate()?;
        let tap = Self::new(&config, handler);
        Ok(Pipeline::new(config.ipv4, config.reassembly, tap))
    }

    fn wants(&self, conn: &TcpConnection) -> bool {
        let (a, b) = conn.id().ports();
        self.rtmp_ports.is_empty() || self.rtmp_ports.contains(&a) || self.rtmp_ports.contains(&b)
    }

    pub fn parser(&self, ctx: &FlowContext) -> Option<&RtmpParser> {
        self.parsers.get(ctx)
    }

    /// Number of flow directions currently parsed
    pub fn active_parsers(&self) -> usize {
        self.parsers.len()
    }

    /// Counters of all parsers, open and closed
    pub fn stats(&self) -> RtmpStats {
        let mut total = self.closed.clone();
        for parser in self.parsers.values() {
            total.merge(parser.stats());
        }
        total
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}

impl<H: RtmpHandler> TcpHandler for RtmpTap<H> {
    fn on_tcp_new_connection_stream(&mut self, conn: &TcpConnection, direction: Direction) {
        if !self.wants(conn) {
            return;
        }
        let ctx = FlowContext::new(conn.id(), direction);
        tracing::debug!(flow = %ctx, from_start = conn.from_handshake(), "Attaching RTMP parser");
        let parser = RtmpParser::new(self.config.clone(), ctx, conn.from_handshake());
        self.parsers.insert(ctx, parser);
    }

    fn on_tcp_data(&mut self, conn: &TcpConnection, direction: Direction, segments: &[TcpSegment]) {
        let ctx = FlowContext::new(conn.id(), direction);
        if let Some(parser) = self.parsers.get_mut(&ctx) {
            for segment in segments {
                parser.append(&segment.payload, &mut self.handler);
            }
        }
    }

    fn on_tcp_closed_connection(&mut self, conn: &TcpConnection, reason: CloseReason) {
        for direction in [Direction::Forward, Direction::Reverse] {
            let ctx = FlowContext::new(conn.id(), direction);
            if let Some(parser) = self.parsers.remove(&ctx) {
                let stats = parser.stats();
                tracing::debug!(
                    flow = %ctx,
                    %reason,
                    messages = stats.messages,
                    resets = stats.resets,
                    "Detached RTMP parser"
                );
                self.closed.merge(stats);
            }
        }
    }
}
