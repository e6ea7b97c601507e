//! AMF0 encoder and decoder
//!
//! Type markers understood by this module:
//! ```text
//! 0x00 Number        f64 big-endian
//! 0x01 Boolean       one byte, non-zero is true
//! 0x02 String        u16 length + UTF-8
//! 0x03 Object        (u16 key, value)* then 00 00 09
//! 0x05 Null
//! 0x06 Undefined
//! 0x08 ECMA array    u32 count hint, then object layout
//! 0x0A Strict array  u32 count, then values
//! 0x0B Date          f64 millis + i16 timezone
//! 0x0C Long string   u32 length + UTF-8
//! ```
//!
//! Captured command payloads are frequently cut short, so
//! [`Amf0Decoder::decode_lenient`] keeps every top-level value decoded
//! before the first failure.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::value::{AmfProperty, AmfValue};
use crate::error::AmfError;

const MARKER_NUMBER: u8 = 0x00;
const MARKER_BOOLEAN: u8 = 0x01;
const MARKER_STRING: u8 = 0x02;
const MARKER_OBJECT: u8 = 0x03;
const MARKER_NULL: u8 = 0x05;
const MARKER_UNDEFINED: u8 = 0x06;
const MARKER_ECMA_ARRAY: u8 = 0x08;
const MARKER_OBJECT_END: u8 = 0x09;
const MARKER_STRICT_ARRAY: u8 = 0x0A;
const MARKER_DATE: u8 = 0x0B;
const MARKER_LONG_STRING: u8 = 0x0C;

/// Objects and arrays deeper than this are rejected
const MAX_NESTING_DEPTH: usize = 64;

/// Outcome of a lenient decode: everything parsed plus an error flag
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AmfResult {
    /// Top-level values in wire order
    pub values: Vec<AmfValue>,
    /// Set when decoding stopped on a malformed or truncated value
    pub got_errors: bool,
    /// The error that stopped decoding, if any
    pub error: Option<AmfError>,
}

impl AmfResult {
    /// Command or handler name (first value when it is a string)
    pub fn name(&self) -> Option<&str> {
        self.values.first()?.as_str()
    }
}

/// Cursor over an AMF0 byte sequence
///
/// The decoder borrows the payload; strings are copied out only once
/// they are known to be complete.
pub struct Amf0Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Amf0Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { buf: data }
    }

    /// Bytes not consumed yet
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Decode the next top-level value
    ///
    /// On error the cursor is left where the failing value started.
    pub fn decode(&mut self) -> Result<AmfValue, AmfError> {
        let start = self.buf;
        let result = self.value(0);
        if result.is_err() {
            self.buf = start;
        }
        result
    }

    /// Decode every value until the input is exhausted
    pub fn decode_all(&mut self) -> Result<Vec<AmfValue>, AmfError> {
        let mut values = Vec::new();
        while self.remaining() > 0 {
            values.push(self.decode()?);
        }
        Ok(values)
    }

    /// Decode until exhaustion or the first malformed value
    ///
    /// Values decoded before the failure are kept; the failing value is
    /// discarded as a whole.
    pub fn decode_lenient(&mut self) -> AmfResult {
        let mut result = AmfResult::default();
        while self.remaining() > 0 {
            match self.decode() {
                Ok(v) => result.values.push(v),
                Err(e) => {
                    result.got_errors = true;
                    result.error = Some(e);
                    break;
                }
            }
        }
        result
    }

    fn value(&mut self, depth: usize) -> Result<AmfValue, AmfError> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(AmfError::NestingTooDeep);
        }
        self.need(1)?;
        let value = match self.buf.get_u8() {
            MARKER_NUMBER => {
                self.need(8)?;
                AmfValue::Number(self.buf.get_f64())
            }
            MARKER_BOOLEAN => {
                self.need(1)?;
                AmfValue::Boolean(self.buf.get_u8() != 0)
            }
            MARKER_STRING => {
                self.need(2)?;
                let len = self.buf.get_u16() as usize;
                AmfValue::String(self.utf8(len)?)
            }
            MARKER_LONG_STRING => {
                self.need(4)?;
                let len = self.buf.get_u32() as usize;
                AmfValue::String(self.utf8(len)?)
            }
            MARKER_OBJECT => AmfValue::Object(self.properties(depth)?),
            MARKER_ECMA_ARRAY => {
                // count hint, unreliable in the wild
                self.need(4)?;
                self.buf.advance(4);
                AmfValue::EcmaArray(self.properties(depth)?)
            }
            MARKER_STRICT_ARRAY => {
                self.need(4)?;
                let count = self.buf.get_u32() as usize;
                let mut items = Vec::with_capacity(count.min(self.buf.remaining()));
                for _ in 0..count {
                    items.push(self.value(depth + 1)?);
                }
                AmfValue::StrictArray(items)
            }
            MARKER_DATE => {
                self.need(10)?;
                let millis = self.buf.get_f64();
                let _timezone = self.buf.get_i16();
                AmfValue::Date(millis)
            }
            MARKER_NULL => AmfValue::Null,
            MARKER_UNDEFINED => AmfValue::Undefined,
            other => return Err(AmfError::UnknownMarker(other)),
        };
        Ok(value)
    }

    fn properties(&mut self, depth: usize) -> Result<Vec<AmfProperty>, AmfError> {
        let mut props = Vec::new();
        loop {
            self.need(2)?;
            let len = self.buf.get_u16() as usize;
            if len == 0 {
                self.need(1)?;
                return match self.buf.get_u8() {
                    MARKER_OBJECT_END => Ok(props),
                    _ => Err(AmfError::InvalidObjectEnd),
                };
            }
            let key = self.utf8(len)?;
            let value = self.value(depth + 1)?;
            props.push(AmfProperty { key, value });
        }
    }

    fn need(&self, n: usize) -> Result<(), AmfError> {
        if self.buf.remaining() < n {
            return Err(AmfError::UnexpectedEof);
        }
        Ok(())
    }

    fn utf8(&mut self, len: usize) -> Result<String, AmfError> {
        self.need(len)?;
        let buf = self.buf;
        let (raw, rest) = buf.split_at(len);
        self.buf = rest;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| AmfError::InvalidUtf8)
    }
}

/// AMF0 encoder writing into a growable buffer
#[derive(Default)]
pub struct Amf0Encoder {
    buf: BytesMut,
}

impl Amf0Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the encoded bytes, leaving the encoder empty
    pub fn finish(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append one value
    pub fn encode(&mut self, value: &AmfValue) {
        let buf = &mut self.buf;
        match value {
            AmfValue::Number(n) => {
                buf.put_u8(MARKER_NUMBER);
                buf.put_f64(*n);
            }
            AmfValue::Boolean(b) => {
                buf.put_u8(MARKER_BOOLEAN);
                buf.put_u8(*b as u8);
            }
            AmfValue::String(s) if s.len() > u16::MAX as usize => {
                buf.put_u8(MARKER_LONG_STRING);
                buf.put_u32(s.len() as u32);
                buf.put_slice(s.as_bytes());
            }
            AmfValue::String(s) => {
                buf.put_u8(MARKER_STRING);
                buf.put_u16(s.len() as u16);
                buf.put_slice(s.as_bytes());
            }
            AmfValue::Object(props) => {
                buf.put_u8(MARKER_OBJECT);
                self.properties(props);
            }
            AmfValue::EcmaArray(props) => {
                buf.put_u8(MARKER_ECMA_ARRAY);
                buf.put_u32(props.len() as u32);
                self.properties(props);
            }
            AmfValue::StrictArray(items) => {
                buf.put_u8(MARKER_STRICT_ARRAY);
                buf.put_u32(items.len() as u32);
                for item in items {
                    self.encode(item);
                }
            }
            AmfValue::Date(millis) => {
                buf.put_u8(MARKER_DATE);
                buf.put_f64(*millis);
                buf.put_i16(0);
            }
            AmfValue::Null => buf.put_u8(MARKER_NULL),
            AmfValue::Undefined => buf.put_u8(MARKER_UNDEFINED),
        }
    }

    /// Append several values in order
    pub fn encode_all(&mut self, values: &[AmfValue]) {
        values.iter().for_each(|v| self.encode(v));
    }

    fn properties(&mut self, props: &[AmfProperty]) {
        for prop in props {
            // keys longer than a short string are cut
            let key = &prop.key.as_bytes()[..prop.key.len().min(u16::MAX as usize)];
            self.buf.put_u16(key.len() as u16);
            self.buf.put_slice(key);
            self.encode(&prop.value);
        }
        self.buf.put_slice(&[0x00, 0x00, MARKER_OBJECT_END]);
    }
}

/// Encode a single value
pub fn encode(value: &AmfValue) -> Bytes {
    let mut encoder = Amf0Encoder::new();
    encoder.encode(value);
    encoder.finish()
}

/// Encode a sequence of values, as found in a command message body
pub fn encode_all(values: &[AmfValue]) -> Bytes {
    let mut encoder = Amf0Encoder::new();
    encoder.encode_all(values);
    encoder.finish()
}

/// Decode the first value in `data`
pub fn decode(data: &[u8]) -> Result<AmfValue, AmfError> {
    Amf0Decoder::new(data).decode()
}

/// Decode a whole message body, keeping values parsed before any error
pub fn decode_lenient(data: &[u8]) -> AmfResult {
    Amf0Decoder::new(data).decode_lenient()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roundtrip() {
        for value in [
            AmfValue::Number(42.5),
            AmfValue::String("hello world".into()),
            AmfValue::Null,
            AmfValue::Boolean(true),
            AmfValue::Undefined,
            AmfValue::Date(1_700_000_000_000.0),
        ] {
            let result = decode_lenient(&encode(&value));
            assert!(!result.got_errors);
            assert_eq!(result.values, vec![value]);
        }
    }

    #[test]
    fn test_nested_object_roundtrip() {
        let value = AmfValue::Object(vec![
            AmfProperty::new("app", "live"),
            AmfProperty::new(
                "meta",
                AmfValue::EcmaArray(vec![
                    AmfProperty::new("width", 1280.0),
                    AmfProperty::new("tags", AmfValue::StrictArray(vec![AmfValue::Null])),
                ]),
            ),
        ]);
        let result = decode_lenient(&encode(&value));
        assert!(!result.got_errors);
        assert_eq!(result.values, vec![value]);
    }

    #[test]
    fn test_ecma_array_wire_bytes() {
        let data: &[u8] = &[
            0x08, 0x00, 0x00, 0x00, 0x02, // ecma array, count 2
            0x00, 0x01, b'a', 0x00, 0x3F, 0xF0, 0, 0, 0, 0, 0, 0, // "a": 1.0
            0x00, 0x01, b'b', 0x02, 0x00, 0x01, b'x', // "b": "x"
            0x00, 0x00, 0x09,
        ];
        let result = decode_lenient(data);
        assert!(!result.got_errors);
        let props = result.values[0].properties().unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[0], AmfProperty::new("a", AmfValue::Number(1.0)));
        assert_eq!(props[1], AmfProperty::new("b", AmfValue::String("x".into())));
    }

    #[test]
    fn test_ecma_count_hint_ignored() {
        let mut data = encode(&AmfValue::EcmaArray(vec![AmfProperty::new("k", 3.0)])).to_vec();
        data[1..5].copy_from_slice(&[0, 0, 0, 99]);
        let value = decode(&data).unwrap();
        assert_eq!(value.get_number("k"), Some(3.0));
    }

    #[test]
    fn test_lenient_keeps_partial_values() {
        let mut data = encode_all(&[
            AmfValue::String("connect".into()),
            AmfValue::Number(1.0),
        ])
        .to_vec();
        // Truncated object: key without value
        data.extend_from_slice(&[0x03, 0x00, 0x03, b'a', b'p', b'p']);

        let result = decode_lenient(&data);
        assert!(result.got_errors);
        assert_eq!(result.error, Some(AmfError::UnexpectedEof));
        assert_eq!(result.name(), Some("connect"));
        assert_eq!(result.values.len(), 2);
    }

    #[test]
    fn test_unknown_marker() {
        let result = decode_lenient(&[0x05, 0x11, 0x00]);
        assert!(result.got_errors);
        assert_eq!(result.values, vec![AmfValue::Null]);
        assert_eq!(result.error, Some(AmfError::UnknownMarker(0x11)));
    }

    #[test]
    fn test_bad_object_end() {
        assert_eq!(decode(&[0x03, 0x00, 0x00, 0x07]), Err(AmfError::InvalidObjectEnd));
    }

    #[test]
    fn test_nesting_limit() {
        let mut data = Vec::new();
        for _ in 0..(MAX_NESTING_DEPTH + 1) {
            data.extend_from_slice(&[0x0A, 0x00, 0x00, 0x00, 0x01]);
        }
        data.push(0x05);
        assert_eq!(decode(&data), Err(AmfError::NestingTooDeep));
    }

    #[test]
    fn test_failed_value_rewinds_cursor() {
        let data = [0x05, 0x02, 0x00, 0x05, b'a'];
        let mut decoder = Amf0Decoder::new(&data);
        assert_eq!(decoder.decode(), Ok(AmfValue::Null));
        assert_eq!(decoder.decode(), Err(AmfError::UnexpectedEof));
        assert_eq!(decoder.remaining(), 4);
    }

    #[test]
    fn test_long_string() {
        let long_str = "x".repeat(70000);
        let value = AmfValue::String(long_str.clone());
        let encoded = encode(&value);
        assert_eq!(encoded[0], MARKER_LONG_STRING);
        assert_eq!(decode(&encoded).unwrap(), AmfValue::String(long_str));
    }
}
