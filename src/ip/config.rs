//! IPv4 reassembly configuration

/// Largest datagram the total length field can describe
pub const MAX_IPV4_DATAGRAM: usize = 65_535;

/// IPv4 reassembly options
#[derive(Debug, Clone)]
pub struct Ipv4Config {
    /// Upper bound on a reassembled datagram payload
    pub max_datagram_size: usize,
}

impl Default for Ipv4Config {
    fn default() -> Self {
        Self {
            max_datagram_size: MAX_IPV4_DATAGRAM,
        }
    }
}

impl Ipv4Config {
    /// Set the maximum reassembled size
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size.min(MAX_IPV4_DATAGRAM);
        self
    }
}
