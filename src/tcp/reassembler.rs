//! Connection demultiplexing and lifecycle

use std::collections::HashMap;
use std::time::Duration;

use super::config::ReassemblyConfig;
use super::conid::TcpConId;
use super::connection::TcpConnection;
use super::handler::{CloseReason, TcpHandler};
use super::queue::StreamQueue;
use super::segment::TcpSegment;
use crate::error::Result;
use crate::packet::TcpPacket;

/// Routes captured segments to per-connection streams
///
/// Connections are created on SYN (or on the first data segment when
/// `track_running_connections` is set). They are removed once delivery
/// reaches a FIN or RST, when a fresh SYN reuses the port pair, by the
/// idle sweep, or by [`close_all`](Self::close_all). All times are
/// capture timestamps supplied by the caller.
pub struct TcpReassembler<H: TcpHandler> {
    config: ReassemblyConfig,
    connections: HashMap<TcpConId, TcpConnection>,
    handler: H,
    last_sweep: Option<Duration>,
}

impl<H: TcpHandler> TcpReassembler<H> {
    pub fn new(config: ReassemblyConfig, handler: H) -> Self {
        Self {
            config,
            connections: HashMap::new(),
            handler,
            last_sweep: None,
        }
    }

    /// Feed one TCP packet captured at `timestamp`
    pub fn add(&mut self, packet: &TcpPacket<'_>, timestamp: Duration) -> Result<()> {
        self.add_segment(TcpSegment::from_packet(packet), timestamp)
    }

    /// Feed one owned segment captured at `timestamp`
    ///
    /// Errors from the stream (queue exhaustion, port mismatch) are
    /// returned after the segment has been dropped; the connection stays
    /// usable.
    pub fn add_segment(&mut self, segment: TcpSegment, timestamp: Duration) -> Result<()> {
        self.maybe_sweep(timestamp);

        let id = TcpConId::new(segment.src_port, segment.dst_port);
        let flags = segment.flags;

        if flags.syn() && !flags.ack() && self.is_port_reuse(id, &segment) {
            self.close(id, CloseReason::PortReuse);
        }

        if !self.connections.contains_key(&id) {
            let from_handshake = flags.syn();
            if !from_handshake
                && (!self.config.track_running_connections || segment.payload.is_empty())
            {
                tracing::trace!(conn = %id, seq = segment.seq, "Segment for unknown connection");
                return Ok(());
            }
            let conn = TcpConnection::new(id, segment.src_port, timestamp, from_handshake);
            tracing::debug!(conn = %id, from_handshake, "New connection");
            self.handler.on_tcp_new_connection(&conn);
            self.connections.insert(id, conn);
        }

        let Some(conn) = self.connections.get_mut(&id) else {
            return Ok(());
        };
        conn.touch(timestamp);

        let direction = conn.direction_of(segment.src_port);
        if conn.stream(direction).is_none() {
            let queue = StreamQueue::new(self.config.queue_max_segments, self.config.queue_max_bytes);
            conn.open_stream(direction, segment.src_port, segment.dst_port, segment.seq, queue);
            tracing::debug!(conn = %id, %direction, seq = segment.seq, "New stream");
            self.handler.on_tcp_new_connection_stream(conn, direction);
        }

        let (result, ended) = match conn.stream_mut(direction) {
            Some(stream) => {
                let result = stream.add(segment);
                (result, stream.ended())
            }
            None => (Ok(Vec::new()), None),
        };

        let result = match result {
            Ok(delivered) => {
                if !delivered.is_empty() {
                    tracing::trace!(conn = %id, %direction, segments = delivered.len(), "Delivering");
                    self.handler.on_tcp_data(conn, direction, &delivered);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(conn = %id, %direction, error = %e, "Segment dropped");
                Err(e.into())
            }
        };

        if let Some(reason) = ended {
            self.close(id, reason);
        }
        result
    }

    /// A SYN whose sequence number differs from the one its direction
    /// was opened with starts a new connection on the same ports
    fn is_port_reuse(&self, id: TcpConId, segment: &TcpSegment) -> bool {
        self.connections
            .get(&id)
            .and_then(|conn| conn.stream(conn.direction_of(segment.src_port)))
            .is_some_and(|stream| stream.initial_seq() != segment.seq)
    }

    fn maybe_sweep(&mut self, now: Duration) {
        if self.config.idle_timeout.is_none() {
            return;
        }
        match self.last_sweep {
            None => self.last_sweep = Some(now),
            Some(last) if now.saturating_sub(last) >= self.config.sweep_interval => {
                self.sweep_idle(now);
            }
            Some(_) => {}
        }
    }

    /// Close connections idle for longer than the configured timeout
    ///
    /// Returns the number of connections closed.
    pub fn sweep_idle(&mut self, now: Duration) -> usize {
        self.last_sweep = Some(now);
        let Some(timeout) = self.config.idle_timeout else {
            return 0;
        };

        let mut idle: Vec<TcpConId> = self
            .connections
            .values()
            .filter(|c| c.is_idle(now, timeout))
            .map(|c| c.id())
            .collect();
        idle.sort();

        for id in &idle {
            self.close(*id, CloseReason::IdleTimeout);
        }
        idle.len()
    }

    /// Close every remaining connection, e.g. at end of capture
    pub fn close_all(&mut self) -> usize {
        let mut ids: Vec<TcpConId> = self.connections.keys().copied().collect();
        ids.sort();
        for id in &ids {
            self.close(*id, CloseReason::Shutdown);
        }
        ids.len()
    }

    fn close(&mut self, id: TcpConId, reason: CloseReason) {
        if let Some(conn) = self.connections.remove(&id) {
            tracing::debug!(
                conn = %id,
                %reason,
                bytes = conn.payload_bytes(),
                "Connection closed"
            );
            self.handler.on_tcp_closed_connection(&conn, reason);
        }
    }

    pub fn connection(&self, id: TcpConId) -> Option<&TcpConnection> {
        self.connections.get(&id)
    }

    /// Number of open connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn config(&self) -> &ReassemblyConfig {
        &self.config
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
