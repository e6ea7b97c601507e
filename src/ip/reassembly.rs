//! IPv4 datagram reassembly
//!
//! Fragments are written into a growable buffer at their byte offset. The
//! datagram is complete once the final fragment (more-fragments clear) has
//! fixed the total size and the received ranges cover `[0, total)`.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use super::config::Ipv4Config;
use crate::error::ReassemblyError;
use crate::packet::Ipv4Packet;

/// Fields that tie fragments to one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FragmentKey {
    identification: u16,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    protocol: u8,
}

impl FragmentKey {
    fn of(packet: &Ipv4Packet<'_>) -> Self {
        Self {
            identification: packet.identification(),
            src: packet.src_addr(),
            dst: packet.dst_addr(),
            protocol: packet.protocol(),
        }
    }
}

/// Single-context IPv4 reassembler
pub struct Ipv4Reassembler {
    config: Ipv4Config,
    /// Datagram currently being assembled
    context: Option<FragmentKey>,
    buffer: Vec<u8>,
    /// Received fragments: offset -> length
    received: BTreeMap<usize, usize>,
    /// Known once the final fragment arrived
    total_len: Option<usize>,
    bytes_received: usize,
}

impl Ipv4Reassembler {
    pub fn new(config: Ipv4Config) -> Self {
        Self {
            config,
            context: None,
            buffer: Vec::new(),
            received: BTreeMap::new(),
            total_len: None,
            bytes_received: 0,
        }
    }

    /// Feed one packet
    ///
    /// Returns the datagram payload once it is complete: the packet's own
    /// payload when it is not fragmented, otherwise the reassembled bytes.
    /// `Ok(None)` means more fragments are needed.
    pub fn add<'a>(
        &'a mut self,
        packet: Ipv4Packet<'a>,
    ) -> Result<Option<&'a [u8]>, ReassemblyError> {
        if !packet.is_fragment() {
            return Ok(Some(packet.payload()));
        }

        let offset = packet.fragment_offset();
        let payload = packet.payload();
        let more = packet.more_fragments();

        if more && payload.len() % 8 != 0 {
            return Err(ReassemblyError::MisalignedFragment {
                offset,
                len: payload.len(),
            });
        }

        let end = offset + payload.len();
        if end > self.config.max_datagram_size {
            return Err(ReassemblyError::DatagramTooLarge {
                size: end,
                max: self.config.max_datagram_size,
            });
        }

        let key = FragmentKey::of(&packet);
        if self.context != Some(key) {
            if let Some(stale) = self.context {
                tracing::debug!(
                    id = stale.identification,
                    src = %stale.src,
                    received = self.bytes_received,
                    "Discarding incomplete datagram"
                );
            }
            self.reset();
            self.context = Some(key);
        }

        if !more {
            self.total_len = Some(end);
        }

        if self.received.contains_key(&offset) {
            tracing::trace!(id = key.identification, offset, "Duplicate fragment");
        } else {
            if self.buffer.len() < end {
                self.buffer.resize(end, 0);
            }
            self.buffer[offset..end].copy_from_slice(payload);
            self.received.insert(offset, payload.len());
            self.bytes_received += payload.len();
        }

        let total = match self.total_len {
            Some(total) if self.covered() >= total => total,
            _ => return Ok(None),
        };

        tracing::trace!(id = key.identification, total, "Datagram reassembled");
        self.context = None;
        self.received.clear();
        self.total_len = None;
        self.bytes_received = 0;
        Ok(Some(&self.buffer[..total]))
    }

    /// Length of the gap-free prefix received so far
    fn covered(&self) -> usize {
        let mut covered = 0;
        for (&offset, &len) in &self.received {
            if offset > covered {
                break;
            }
            covered = covered.max(offset + len);
        }
        covered
    }

    /// Whether fragments of an incomplete datagram are held
    pub fn is_pending(&self) -> bool {
        self.context.is_some()
    }

    /// Payload bytes held for the incomplete datagram
    pub fn pending_bytes(&self) -> usize {
        self.bytes_received
    }

    /// Drop any partially assembled datagram
    pub fn reset(&mut self) {
        self.context = None;
        self.buffer.clear();
        self.received.clear();
        self.total_len = None;
        self.bytes_received = 0;
    }
}

impl Default for Ipv4Reassembler {
    fn default() -> Self {
        Self::new(Ipv4Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::builder::Ipv4Builder;

    fn datagram(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    fn permutations(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![vec![]];
        }
        let mut out = Vec::new();
        for perm in permutations(n - 1) {
            for pos in 0..=perm.len() {
                let mut p = perm.clone();
                p.insert(pos, n - 1);
                out.push(p);
            }
        }
        out
    }

    #[test]
    fn test_unfragmented_passthrough() {
        let raw = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2]).build(b"payload");
        let mut reassembler = Ipv4Reassembler::default();
        let out = reassembler.add(Ipv4Packet::new_checked(&raw).unwrap()).unwrap();
        assert_eq!(out, Some(&b"payload"[..]));
        assert!(!reassembler.is_pending());
    }

    #[test]
    fn test_three_fragments_reverse_order() {
        let data = datagram(3000);
        let frags = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2])
            .identification(7)
            .build_fragments(&data, 1400);
        let mut reassembler = Ipv4Reassembler::default();

        let out = reassembler.add(Ipv4Packet::new_checked(&frags[2]).unwrap()).unwrap();
        assert!(out.is_none());
        let out = reassembler.add(Ipv4Packet::new_checked(&frags[1]).unwrap()).unwrap();
        assert!(out.is_none());
        assert_eq!(reassembler.pending_bytes(), 1600);

        let out = reassembler
            .add(Ipv4Packet::new_checked(&frags[0]).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(out.len(), 3000);
        assert_eq!(out, &data[..]);
        assert!(!reassembler.is_pending());
    }

    #[test]
    fn test_every_delivery_order() {
        let data = datagram(2000);
        let frags = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2]).build_fragments(&data, 512);
        assert_eq!(frags.len(), 4);

        for order in permutations(frags.len()) {
            let mut reassembler = Ipv4Reassembler::default();
            let mut completed = Vec::new();
            for (n, &i) in order.iter().enumerate() {
                let packet = Ipv4Packet::new_checked(&frags[i]).unwrap();
                if let Some(out) = reassembler.add(packet).unwrap() {
                    assert_eq!(n, order.len() - 1, "completed early for {:?}", order);
                    completed.push(out.to_vec());
                }
            }
            assert_eq!(completed, vec![data.clone()], "order {:?}", order);
        }
    }

    #[test]
    fn test_duplicate_fragment_ignored() {
        let data = datagram(1024);
        let frags = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2]).build_fragments(&data, 512);
        let mut reassembler = Ipv4Reassembler::default();

        assert!(reassembler.add(Ipv4Packet::new_checked(&frags[0]).unwrap()).unwrap().is_none());
        assert!(reassembler.add(Ipv4Packet::new_checked(&frags[0]).unwrap()).unwrap().is_none());
        assert_eq!(reassembler.pending_bytes(), 512);
        let out = reassembler.add(Ipv4Packet::new_checked(&frags[1]).unwrap()).unwrap();
        assert_eq!(out, Some(&data[..]));
    }

    #[test]
    fn test_new_identification_restarts_context() {
        let data = datagram(1024);
        let first = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2])
            .identification(1)
            .build_fragments(&data, 512);
        let second = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2])
            .identification(2)
            .build_fragments(&data, 512);
        let mut reassembler = Ipv4Reassembler::default();

        assert!(reassembler.add(Ipv4Packet::new_checked(&first[0]).unwrap()).unwrap().is_none());
        // Tail of datagram 2 cannot complete datagram 1
        assert!(reassembler.add(Ipv4Packet::new_checked(&second[1]).unwrap()).unwrap().is_none());
        let out = reassembler.add(Ipv4Packet::new_checked(&second[0]).unwrap()).unwrap();
        assert_eq!(out, Some(&data[..]));
    }

    #[test]
    fn test_misaligned_fragment_rejected() {
        let raw = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2])
            .fragment(0, true)
            .build(&[0u8; 13]);
        let mut reassembler = Ipv4Reassembler::default();
        let err = reassembler.add(Ipv4Packet::new_checked(&raw).unwrap()).unwrap_err();
        assert_eq!(err, ReassemblyError::MisalignedFragment { offset: 0, len: 13 });
    }

    #[test]
    fn test_oversized_datagram_rejected() {
        let raw = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2])
            .fragment(2048, false)
            .build(&[0u8; 100]);
        let mut reassembler = Ipv4Reassembler::new(Ipv4Config::default().max_datagram_size(2100));
        let err = reassembler.add(Ipv4Packet::new_checked(&raw).unwrap()).unwrap_err();
        assert_eq!(err, ReassemblyError::DatagramTooLarge { size: 2148, max: 2100 });
    }
}
