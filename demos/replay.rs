//! Replay a synthetic RTMP publish session through the tap
//!
//! Builds the frames a client publishing to a server would produce
//! (handshake, connect, @setDataFrame, audio and video), fragments the
//! large segments, swaps some neighbouring datagrams, and feeds everything to
//! the pipeline through the async driver.
//!
//! Run with: cargo run --example replay
//! More detail: RUST_LOG=rtmp_tap=trace cargo run --example replay

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use rtmp_tap::amf::{amf0, AmfProperty, AmfValue};
use rtmp_tap::capture::{frame_channel, run_frames, RawFrame};
use rtmp_tap::packet::builder::{ethernet_frame, Ipv4Builder, TcpBuilder};
use rtmp_tap::packet::TcpFlags;
use rtmp_tap::rtmp::constants::*;
use rtmp_tap::rtmp::{ChunkEncoder, FlowContext, RtmpHandler, RtmpMessage};
use rtmp_tap::{AmfResult, Error, RtmpTap, TapConfig};

const CLIENT: [u8; 4] = [192, 168, 1, 20];
const SERVER: [u8; 4] = [192, 168, 1, 10];
const CLIENT_PORT: u16 = 51334;

/// Prints what the tap reconstructs
#[derive(Default)]
struct Printer {
    audio: usize,
    video: usize,
}

impl RtmpHandler for Printer {
    fn on_rtmp_amf(&mut self, ctx: &FlowContext, message: &RtmpMessage, result: &AmfResult) {
        println!(
            "[{}] AMF type={} ts={} name={:?} values={}",
            ctx,
            message.type_id,
            message.timestamp,
            result.name(),
            result.values.len()
        );
        if let Some(meta) = result.values.iter().find(|v| v.properties().is_some()) {
            for prop in meta.properties().unwrap_or_default() {
                println!("    {} = {:?}", prop.key, prop.value);
            }
        }
    }

    fn on_rtmp_data(&mut self, _ctx: &FlowContext, message: &RtmpMessage) {
        match message.type_id {
            MSG_AUDIO => self.audio += 1,
            MSG_VIDEO => self.video += 1,
            _ => {}
        }
    }

    fn on_rtmp_reset(&mut self, ctx: &FlowContext, reason: &Error) {
        println!("[{}] parser reset: {}", ctx, reason);
    }
}

/// Client-side byte stream of a publish session
fn client_stream() -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[RTMP_VERSION]);
    buf.extend_from_slice(&[0u8; 2 * HANDSHAKE_SIZE]);

    let mut encoder = ChunkEncoder::new();
    let connect = amf0::encode_all(&[
        AmfValue::from(CMD_CONNECT),
        AmfValue::Number(1.0),
        AmfValue::Object(vec![
            AmfProperty::new("app", "live"),
            AmfProperty::new("type", "nonprivate"),
            AmfProperty::new("tcUrl", "rtmp://192.168.1.10/live"),
        ]),
    ]);
    encoder.encode(
        &RtmpMessage::new(CSID_COMMAND, 0, MSG_COMMAND_AMF0, 0, connect),
        &mut buf,
    );

    let chunk_size = 4096u32;
    encoder.encode(
        &RtmpMessage::new(
            CSID_PROTOCOL_CONTROL,
            0,
            MSG_SET_CHUNK_SIZE,
            0,
            Bytes::copy_from_slice(&chunk_size.to_be_bytes()),
        ),
        &mut buf,
    );
    encoder.set_chunk_size(chunk_size);

    let publish = amf0::encode_all(&[
        AmfValue::from(CMD_PUBLISH),
        AmfValue::Number(5.0),
        AmfValue::Null,
        AmfValue::from("stream-key"),
        AmfValue::from("live"),
    ]);
    encoder.encode(
        &RtmpMessage::new(CSID_COMMAND, 0, MSG_COMMAND_AMF0, 1, publish),
        &mut buf,
    );

    let metadata = amf0::encode_all(&[
        AmfValue::from(CMD_SET_DATA_FRAME),
        AmfValue::from(CMD_ON_METADATA),
        AmfValue::EcmaArray(vec![
            AmfProperty::new("width", 1280.0),
            AmfProperty::new("height", 720.0),
            AmfProperty::new("framerate", 30.0),
            AmfProperty::new("encoder", "replay-demo"),
        ]),
    ]);
    encoder.encode(
        &RtmpMessage::new(CSID_COMMAND, 0, MSG_DATA_AMF0, 1, metadata),
        &mut buf,
    );

    for i in 0..30u32 {
        let video = vec![if i % 10 == 0 { 0x17 } else { 0x27 }; 3000];
        encoder.encode(
            &RtmpMessage::new(CSID_VIDEO, i * 33, MSG_VIDEO, 1, Bytes::from(video)),
            &mut buf,
        );
        let audio = vec![0xAF; 200];
        encoder.encode(
            &RtmpMessage::new(CSID_AUDIO, i * 33, MSG_AUDIO, 1, Bytes::from(audio)),
            &mut buf,
        );
    }
    buf.to_vec()
}

/// Server side: handshake only
fn server_stream() -> Vec<u8> {
    let mut bytes = vec![RTMP_VERSION];
    bytes.extend_from_slice(&[0u8; 2 * HANDSHAKE_SIZE]);
    bytes
}

/// Ethernet frames per IP datagram, in send order
fn datagrams() -> Vec<Vec<Vec<u8>>> {
    let to_server = |seq: u32, flags: u8, payload: &[u8], id: u16| {
        let tcp = TcpBuilder::new(CLIENT_PORT, RTMP_PORT).seq(seq).flags(flags).build(payload);
        Ipv4Builder::new(CLIENT, SERVER)
            .identification(id)
            .build_fragments(&tcp, 1480)
    };
    let to_client = |seq: u32, flags: u8, payload: &[u8], id: u16| {
        let tcp = TcpBuilder::new(RTMP_PORT, CLIENT_PORT).seq(seq).flags(flags).build(payload);
        Ipv4Builder::new(SERVER, CLIENT)
            .identification(id)
            .build_fragments(&tcp, 1480)
    };

    let mut datagrams = vec![
        to_server(1000, TcpFlags::SYN, b"", 1),
        to_client(7000, TcpFlags::SYN | TcpFlags::ACK, b"", 1),
        to_client(7001, TcpFlags::ACK, &server_stream(), 2),
    ];

    let client = client_stream();
    let mut seq = 1001u32;
    for (i, segment) in client.chunks(2800).enumerate() {
        datagrams.push(to_server(seq, TcpFlags::ACK | TcpFlags::PSH, segment, 10 + i as u16));
        seq += segment.len() as u32;
    }
    datagrams.push(to_server(seq, TcpFlags::FIN | TcpFlags::ACK, b"", 9999));

    datagrams
        .into_iter()
        .map(|fragments| fragments.iter().map(|f| ethernet_frame(f)).collect())
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rtmp_tap=info".parse()?),
        )
        .init();

    // Swap some data-carrying datagrams with a later neighbour to exercise
    // out-of-order delivery; fragments of one datagram stay adjacent
    let mut datagrams = datagrams();
    let mut rng = StdRng::seed_from_u64(7);
    let mut picks: Vec<usize> = (3..datagrams.len() - 3).step_by(4).collect();
    picks.shuffle(&mut rng);
    for &i in picks.iter().take(picks.len() / 2) {
        datagrams.swap(i, i + 2);
    }
    let frames: Vec<Vec<u8>> = datagrams.into_iter().flatten().collect();

    let pipeline = RtmpTap::pipeline(TapConfig::default(), Printer::default())?;
    let (tx, rx) = frame_channel(256);

    let total = frames.len();
    let producer = tokio::spawn(async move {
        for (i, data) in frames.into_iter().enumerate() {
            let frame = RawFrame::new(data, Duration::from_millis(i as u64));
            if tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    let pipeline = run_frames(pipeline, rx).await?;
    producer.await?;

    let stats = pipeline.stats().clone();
    let tap = pipeline.into_handler();
    let rtmp = tap.stats();
    println!(
        "frames={} fragments={} reassembled={} segments={}",
        total, stats.fragments, stats.reassembled, stats.tcp_segments
    );
    println!(
        "messages={} amf={} media={} resets={} audio={} video={}",
        rtmp.messages,
        rtmp.amf_messages,
        rtmp.media_messages,
        rtmp.resets,
        tap.handler().audio,
        tap.handler().video
    );
    Ok(())
}
