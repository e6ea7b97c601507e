//! Connection identity and direction

use std::fmt;

/// Direction-independent connection identity
///
/// Built from the two TCP ports and stored as an ordered (low, high)
/// pair, so `TcpConId::new(a, b) == TcpConId::new(b, a)` and both hash
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TcpConId {
    low: u16,
    high: u16,
}

impl TcpConId {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        Self {
            low: src_port.min(dst_port),
            high: src_port.max(dst_port),
        }
    }

    /// Ports in ascending order
    pub fn ports(&self) -> (u16, u16) {
        (self.low, self.high)
    }

    /// Whether `port` is one of the two endpoints
    pub fn involves(&self, port: u16) -> bool {
        self.low == port || self.high == port
    }
}

impl fmt::Display for TcpConId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.low, self.high)
    }
}

/// Traffic direction within a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sent by the endpoint seen first (the SYN sender when captured)
    Forward,
    /// Sent by the other endpoint
    Reverse,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(id: &TcpConId) -> u64 {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_symmetric_identity() {
        for (a, b) in [(1935u16, 50000u16), (80, 443), (0, 65535), (1, 2)] {
            assert_eq!(TcpConId::new(a, b), TcpConId::new(b, a));
            assert_eq!(hash_of(&TcpConId::new(a, b)), hash_of(&TcpConId::new(b, a)));
        }
    }

    #[test]
    fn test_no_sum_collisions() {
        // Same port sum, different connections
        assert_ne!(TcpConId::new(1000, 2000), TcpConId::new(1500, 1500));
        assert_ne!(TcpConId::new(1, 4), TcpConId::new(2, 3));
    }

    #[test]
    fn test_accessors() {
        let id = TcpConId::new(50000, 1935);
        assert_eq!(id.ports(), (1935, 50000));
        assert!(id.involves(1935));
        assert!(!id.involves(80));
        assert_eq!(id.to_string(), "1935<->50000");
        assert_eq!(Direction::Forward.opposite(), Direction::Reverse);
    }
}
