//! Connection state: one stream per direction

use std::time::Duration;

use super::conid::{Direction, TcpConId};
use super::queue::StreamQueue;
use super::stream::TcpStream;

/// A tracked TCP connection
///
/// The endpoint whose segment created the connection defines
/// [`Direction::Forward`]. Streams are created lazily on the first
/// segment of each direction.
#[derive(Debug)]
pub struct TcpConnection {
    id: TcpConId,
    initiator_port: u16,
    streams: [Option<TcpStream>; 2],
    created_at: Duration,
    last_seen: Duration,
    from_handshake: bool,
}

impl TcpConnection {
    pub fn new(id: TcpConId, initiator_port: u16, now: Duration, from_handshake: bool) -> Self {
        Self {
            id,
            initiator_port,
            streams: [None, None],
            created_at: now,
            last_seen: now,
            from_handshake,
        }
    }

    pub fn id(&self) -> TcpConId {
        self.id
    }

    /// Source port of the segment that created the connection
    pub fn initiator_port(&self) -> u16 {
        self.initiator_port
    }

    /// Whether the connection was created from a captured SYN
    pub fn from_handshake(&self) -> bool {
        self.from_handshake
    }

    pub fn created_at(&self) -> Duration {
        self.created_at
    }

    /// Capture time of the most recent segment
    pub fn last_seen(&self) -> Duration {
        self.last_seen
    }

    /// Direction of a segment sent from `src_port`
    pub fn direction_of(&self, src_port: u16) -> Direction {
        if src_port == self.initiator_port {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    pub fn stream(&self, direction: Direction) -> Option<&TcpStream> {
        self.streams[direction.index()].as_ref()
    }

    pub(crate) fn stream_mut(&mut self, direction: Direction) -> Option<&mut TcpStream> {
        self.streams[direction.index()].as_mut()
    }

    pub(crate) fn open_stream(
        &mut self,
        direction: Direction,
        src_port: u16,
        dst_port: u16,
        initial_seq: u32,
        queue: StreamQueue,
    ) -> &mut TcpStream {
        self.streams[direction.index()]
            .insert(TcpStream::with_queue(src_port, dst_port, initial_seq, queue))
    }

    pub(crate) fn touch(&mut self, now: Duration) {
        if now > self.last_seen {
            self.last_seen = now;
        }
    }

    /// Whether no segment arrived within `timeout` before `now`
    pub fn is_idle(&self, now: Duration, timeout: Duration) -> bool {
        now.saturating_sub(self.last_seen) > timeout
    }

    /// Ordered payload bytes delivered in both directions
    pub fn payload_bytes(&self) -> u64 {
        self.streams
            .iter()
            .flatten()
            .map(|s| s.stats().payload_bytes)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_and_streams() {
        let id = TcpConId::new(50000, 1935);
        let mut conn = TcpConnection::new(id, 50000, Duration::from_secs(1), true);
        assert_eq!(conn.direction_of(50000), Direction::Forward);
        assert_eq!(conn.direction_of(1935), Direction::Reverse);
        assert!(conn.stream(Direction::Forward).is_none());

        conn.open_stream(Direction::Reverse, 1935, 50000, 77, StreamQueue::default());
        assert!(conn.stream(Direction::Forward).is_none());
        assert_eq!(conn.stream(Direction::Reverse).unwrap().next_seq(), 77);
        assert_eq!(conn.payload_bytes(), 0);
    }

    #[test]
    fn test_idle() {
        let mut conn = TcpConnection::new(TcpConId::new(1, 2), 1, Duration::from_secs(10), false);
        assert!(!conn.is_idle(Duration::from_secs(15), Duration::from_secs(5)));
        assert!(conn.is_idle(Duration::from_secs(16), Duration::from_secs(5)));

        conn.touch(Duration::from_secs(14));
        conn.touch(Duration::from_secs(12));
        assert_eq!(conn.last_seen(), Duration::from_secs(14));
        assert!(!conn.is_idle(Duration::from_secs(16), Duration::from_secs(5)));
    }
}
