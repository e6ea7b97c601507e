//! Tap configuration

use crate::error::Result;
use crate::ip::Ipv4Config;
use crate::rtmp::constants::RTMP_PORT;
use crate::rtmp::RtmpConfig;
use crate::tcp::ReassemblyConfig;

/// Options for a complete capture-to-RTMP tap
#[derive(Debug, Clone)]
pub struct TapConfig {
    /// Connections involving one of these ports are parsed as RTMP; an
    /// empty list parses every connection
    pub rtmp_ports: Vec<u16>,

    pub ipv4: Ipv4Config,

    pub reassembly: ReassemblyConfig,

    pub rtmp: RtmpConfig,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            rtmp_ports: vec![RTMP_PORT],
            ipv4: Ipv4Config::default(),
            reassembly: ReassemblyConfig::default(),
            rtmp: RtmpConfig::default(),
        }
    }
}

impl TapConfig {
    /// Replace the RTMP port filter
    pub fn rtmp_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.rtmp_ports = ports.into_iter().collect();
        self
    }

    /// Parse every TCP connection as RTMP
    pub fn any_port(mut self) -> Self {
        self.rtmp_ports.clear();
        self
    }

    pub fn ipv4(mut self, config: Ipv4Config) -> Self {
        self.ipv4 = config;
        self
    }

    pub fn reassembly(mut self, config: ReassemblyConfig) -> Self {
        self.reassembly = config;
        self
    }

    pub fn rtmp(mut self, config: RtmpConfig) -> Self {
        self.rtmp = config;
        self
    }

    /// Whether a connection between these ports should be parsed
    pub fn matches(&self, ports: (u16, u16)) -> bool {
        self.rtmp_ports.is_empty()
            || self.rtmp_ports.contains(&ports.0)
            || self.rtmp_ports.contains(&ports.1)
    }

    pub fn validate(&self) -> Result<()> {
        self.reassembly.validate()?;
        self.rtmp.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_filter() {
        let config = TapConfig::default();
        assert!(config.matches((1935, 50000)));
        assert!(config.matches((50000, 1935)));
        assert!(!config.matches((80, 50000)));

        let config = config.rtmp_ports([1935, 19350]);
        assert!(config.matches((19350, 6000)));

        let config = TapConfig::default().any_port();
        assert!(config.matches((80, 443)));
        assert!(config.validate().is_ok());
    }
}
