//! Async frame driver
//!
//! Runs a [`Pipeline`] on a single task, fed by a bounded channel from a
//! capture source running elsewhere.

use tokio::sync::mpsc;

use super::frame::RawFrame;
use super::pipeline::Pipeline;
use crate::error::Result;
use crate::tcp::TcpHandler;

/// Default frame channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Create the channel a capture source sends frames into
pub fn frame_channel(capacity: usize) -> (mpsc::Sender<RawFrame>, mpsc::Receiver<RawFrame>) {
    mpsc::channel(capacity)
}

/// Process frames until every sender is dropped
///
/// Recoverable errors are logged and processing continues. A contract
/// violation stops the driver and is returned. On a clean end of input
/// all remaining connections are closed and the pipeline is handed back.
pub async fn run_frames<T: TcpHandler>(
    mut pipeline: Pipeline<T>,
    mut frames: mpsc::Receiver<RawFrame>,
) -> Result<Pipeline<T>> {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = pipeline.process(&frame) {
            if e.is_contract_violation() {
                tracing::warn!(error = %e, "Stopping capture");
                return Err(e);
            }
            tracing::warn!(error = %e, timestamp = ?frame.timestamp, "Frame dropped");
        }
    }
    pipeline.finish();
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{RtmpTap, TapConfig};
    use crate::packet::builder::{ethernet_frame, Ipv4Builder, TcpBuilder};
    use crate::packet::TcpFlags;
    use crate::rtmp::constants::{CSID_AUDIO, MSG_AUDIO};
    use crate::rtmp::{ChunkEncoder, FlowContext, RtmpHandler, RtmpMessage};
    use bytes::{Bytes, BytesMut};
    use std::time::Duration;

    #[derive(Default)]
    struct Count {
        media: usize,
    }

    impl RtmpHandler for Count {
        fn on_rtmp_data(&mut self, _ctx: &FlowContext, _message: &RtmpMessage) {
            self.media += 1;
        }
    }

    fn frame(seq: u32, flags: u8, payload: &[u8]) -> RawFrame {
        let tcp = TcpBuilder::new(50000, 1935).seq(seq).flags(flags).build(payload);
        let ip = Ipv4Builder::new([10, 0, 0, 2], [10, 0, 0, 1]).build(&tcp);
        RawFrame::new(ethernet_frame(&ip), Duration::from_millis(seq as u64))
    }

    #[tokio::test]
    async fn test_run_frames_from_channel() {
        let config = TapConfig::default().rtmp(crate::rtmp::RtmpConfig::default().skip_handshake(false));
        let pipeline = RtmpTap::pipeline(config, Count::default()).unwrap();
        let (tx, rx) = frame_channel(DEFAULT_CHANNEL_CAPACITY);

        let mut wire = BytesMut::new();
        let mut encoder = ChunkEncoder::new();
        for i in 0..3u32 {
            let audio = RtmpMessage::new(CSID_AUDIO, i * 23, MSG_AUDIO, 1, Bytes::from(vec![0xAF; 50]));
            encoder.encode(&audio, &mut wire);
        }

        let producer = tokio::spawn(async move {
            tx.send(frame(0, TcpFlags::SYN, b"")).await.unwrap();
            tx.send(frame(1, TcpFlags::ACK, &wire)).await.unwrap();
            tx.send(frame(1 + wire.len() as u32, TcpFlags::FIN, b"")).await.unwrap();
        });

        let pipeline = run_frames(pipeline, rx).await.unwrap();
        producer.await.unwrap();

        assert_eq!(pipeline.stats().frames, 3);
        assert!(pipeline.tcp().is_empty());
        let tap = pipeline.into_handler();
        assert_eq!(tap.stats().media_messages, 3);
        assert_eq!(tap.handler().media, 3);
    }

    #[tokio::test]
    async fn test_contract_violation_stops_driver() {
        let pipeline = RtmpTap::pipeline(TapConfig::default(), Count::default()).unwrap();
        let (tx, rx) = frame_channel(4);

        let bad = Ipv4Builder::new([1, 1, 1, 1], [2, 2, 2, 2])
            .fragment(0, true)
            .build(&[0u8; 13]);
        tx.send(RawFrame::new(ethernet_frame(&bad), Duration::ZERO)).await.unwrap();
        drop(tx);

        let err = run_frames(pipeline, rx).await.err().unwrap();
        assert!(err.is_contract_violation());
    }
}
