//! Wire constants of the RTMP chunk layer
//!
//! Values follow the Adobe RTMP specification (December 2012).

pub const RTMP_VERSION: u8 = 3;
pub const RTMP_PORT: u16 = 1935;

/// Length of each of C1, C2, S1 and S2
pub const HANDSHAKE_SIZE: usize = 1536;

/// Handshake bytes sent by one side before its first chunk (C0 + C1 + C2)
pub const HANDSHAKE_LEN: usize = 1 + 2 * HANDSHAKE_SIZE;

pub const DEFAULT_CHUNK_SIZE: u32 = 128;
pub const MAX_CHUNK_SIZE: u32 = 0xFFFFFF;

/// Message lengths are 24-bit on the wire
pub const MAX_MESSAGE_SIZE: u32 = 0xFFFFFF;

/// A timestamp field holding this value is followed by a 32-bit timestamp
pub const EXTENDED_TIMESTAMP_THRESHOLD: u32 = 0xFFFFFF;

// Conventional chunk stream ids
pub const CSID_PROTOCOL_CONTROL: u32 = 2;
pub const CSID_COMMAND: u32 = 3;
pub const CSID_AUDIO: u32 = 4;
pub const CSID_VIDEO: u32 = 6;

// Message type ids; 1 to 6 are protocol control
pub const MSG_SET_CHUNK_SIZE: u8 = 1;
pub const MSG_ABORT: u8 = 2;
pub const MSG_ACKNOWLEDGEMENT: u8 = 3;
pub const MSG_USER_CONTROL: u8 = 4;
pub const MSG_WINDOW_ACK_SIZE: u8 = 5;
pub const MSG_SET_PEER_BANDWIDTH: u8 = 6;
pub const MSG_AUDIO: u8 = 8;
pub const MSG_VIDEO: u8 = 9;
pub const MSG_DATA_AMF3: u8 = 15;
pub const MSG_COMMAND_AMF3: u8 = 17;
pub const MSG_DATA_AMF0: u8 = 18;
pub const MSG_COMMAND_AMF0: u8 = 20;
pub const MSG_AGGREGATE: u8 = 22;

// User control event types
pub const UC_STREAM_BEGIN: u16 = 0;
pub const UC_STREAM_EOF: u16 = 1;
pub const UC_STREAM_DRY: u16 = 2;
pub const UC_SET_BUFFER_LENGTH: u16 = 3;
pub const UC_STREAM_IS_RECORDED: u16 = 4;
pub const UC_PING_REQUEST: u16 = 6;
pub const UC_PING_RESPONSE: u16 = 7;

/// Chunk header formats: full, no message id, delta only, none
pub const CHUNK_FMT_0: u8 = 0;
pub const CHUNK_FMT_1: u8 = 1;
pub const CHUNK_FMT_2: u8 = 2;
pub const CHUNK_FMT_3: u8 = 3;

// Command and data handler names seen on publishing sessions
pub const CMD_CONNECT: &str = "connect";
pub const CMD_PUBLISH: &str = "publish";
pub const CMD_SET_DATA_FRAME: &str = "@setDataFrame";
pub const CMD_ON_METADATA: &str = "onMetaData";
