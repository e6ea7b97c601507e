//! IPv4 fragment reassembly
//!
//! A single fragmentation context is tracked per [`Ipv4Reassembler`].
//! Unfragmented packets pass straight through without copying.

pub mod config;
pub mod reassembly;

pub use config::Ipv4Config;
pub use reassembly::Ipv4Reassembler;
