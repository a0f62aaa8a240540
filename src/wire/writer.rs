//! Avro binary encoding primitives.
//!
//! Ints and longs are zig-zag varints, floats and doubles little-endian
//! IEEE 754, bytes and strings length-prefixed, fixed raw. Null writes
//! nothing. Records have no framing at all; the schema carries the
//! shape.

use crate::error::CodecError;

/// Buffered output for one serialization call.
///
/// Generated code writes into `buf`; a flush moves the buffered bytes
/// onto `out`. Every cycle-breaker call site flushes first so that the
/// auxiliary function's bytes land in stream order.
#[derive(Default)]
pub struct OutputBuffer {
    out: Vec<u8>,
    buf: Vec<u8>,
}

impl OutputBuffer {
    pub fn new() -> OutputBuffer {
        OutputBuffer::default()
    }

    /// The buffer generated statements append to.
    pub fn buf(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Move everything buffered so far onto the output.
    pub fn flush(&mut self) {
        self.out.append(&mut self.buf);
    }

    /// Final flush and hand-off of the produced bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.out
    }
}

/// Encode an unsigned varint: 7 data bits per byte, MSB as the
/// continuation bit, little-endian byte order.
#[inline]
pub fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Null has no binary representation.
#[inline]
pub fn write_null(_buf: &mut Vec<u8>) {}

#[inline]
pub fn write_boolean(buf: &mut Vec<u8>, value: bool) {
    buf.push(value as u8);
}

/// Zig-zag encode: (n << 1) ^ (n >> 63).
#[inline]
pub fn write_long(buf: &mut Vec<u8>, value: i64) {
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    write_varint(buf, zigzag);
}

#[inline]
pub fn write_int(buf: &mut Vec<u8>, value: i32) {
    write_long(buf, value as i64);
}

#[inline]
pub fn write_float(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn write_double(buf: &mut Vec<u8>, value: f64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn write_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    write_long(buf, value.len() as i64);
    buf.extend_from_slice(value);
}

#[inline]
pub fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_bytes(buf, value.as_bytes());
}

/// Write exactly `size` raw bytes, no length prefix.
#[inline]
pub fn write_fixed(buf: &mut Vec<u8>, size: usize, value: &[u8], location: &str) -> Result<(), CodecError> {
    if value.len() != size {
        return Err(CodecError::FixedSizeMismatch {
            size,
            found: value.len(),
            location: location.to_string(),
        });
    }
    buf.extend_from_slice(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_long_zigzag() {
        let cases: [(i64, &[u8]); 6] = [
            (0, &[0x00]),
            (-1, &[0x01]),
            (1, &[0x02]),
            (-2, &[0x03]),
            (5, &[0x0a]),
            (64, &[0x80, 0x01]),
        ];
        for (value, expected) in cases {
            let mut buf = Vec::new();
            write_long(&mut buf, value);
            assert_eq!(buf, expected, "value {value}");
        }
    }

    #[test]
    fn test_write_boolean() {
        let mut buf = Vec::new();
        write_boolean(&mut buf, true);
        write_boolean(&mut buf, false);
        assert_eq!(buf, [0x01, 0x00]);
    }

    #[test]
    fn test_write_string_length_prefixed() {
        let mut buf = Vec::new();
        write_string(&mut buf, "abc");
        assert_eq!(buf, [0x06, b'a', b'b', b'c']);
    }

    #[test]
    fn test_write_null_writes_nothing() {
        let mut buf = Vec::new();
        write_null(&mut buf);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_write_fixed_enforces_size() {
        let mut buf = Vec::new();
        write_fixed(&mut buf, 4, &[1, 2, 3, 4], "data").unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        let err = write_fixed(&mut buf, 4, &[1, 2], "data").unwrap_err();
        assert!(matches!(err, CodecError::FixedSizeMismatch { .. }));
    }

    #[test]
    fn test_output_buffer_flush_keeps_stream_order() {
        let mut out = OutputBuffer::new();
        write_long(out.buf(), 1);
        out.flush();
        write_long(out.buf(), 2);
        assert_eq!(out.into_bytes(), [0x02, 0x04]);
    }

    #[test]
    fn test_float_little_endian() {
        let mut buf = Vec::new();
        write_float(&mut buf, 1.0);
        assert_eq!(buf, [0x00, 0x00, 0x80, 0x3f]);
    }
}
