//! Avro binary decoding primitives.
//!
//! All readers consume a `&mut &[u8]` cursor that is advanced past the
//! decoded bytes. Truncated input is `CodecError::UnexpectedEof`.

use crate::error::CodecError;

/// Decode an unsigned varint (7 data bits per byte, MSB continuation).
#[inline]
pub fn read_varint(input: &mut &[u8]) -> Result<u64, CodecError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if input.is_empty() {
            return Err(CodecError::UnexpectedEof);
        }
        let byte = input[0];
        *input = &input[1..];
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        // Max 10 bytes for a 64-bit varint.
        if shift >= 64 {
            return Err(CodecError::InvalidVarint);
        }
    }
}

/// Null consumes no bytes.
#[inline]
pub fn read_null(_input: &mut &[u8]) -> Result<(), CodecError> {
    Ok(())
}

#[inline]
pub fn read_boolean(input: &mut &[u8]) -> Result<bool, CodecError> {
    if input.is_empty() {
        return Err(CodecError::UnexpectedEof);
    }
    let byte = input[0];
    *input = &input[1..];
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::InvalidBoolean(other)),
    }
}

/// Zig-zag decode: (n >> 1) ^ -(n & 1).
#[inline]
pub fn read_long(input: &mut &[u8]) -> Result<i64, CodecError> {
    let unsigned = read_varint(input)?;
    Ok(((unsigned >> 1) as i64) ^ (-((unsigned & 1) as i64)))
}

#[inline]
pub fn read_int(input: &mut &[u8]) -> Result<i32, CodecError> {
    let long = read_long(input)?;
    i32::try_from(long).map_err(|_| CodecError::IntOverflow(long))
}

#[inline]
pub fn read_float(input: &mut &[u8]) -> Result<f32, CodecError> {
    if input.len() < 4 {
        return Err(CodecError::UnexpectedEof);
    }
    let bytes: [u8; 4] = input[..4].try_into().expect("length checked");
    *input = &input[4..];
    Ok(f32::from_le_bytes(bytes))
}

#[inline]
pub fn read_double(input: &mut &[u8]) -> Result<f64, CodecError> {
    if input.len() < 8 {
        return Err(CodecError::UnexpectedEof);
    }
    let bytes: [u8; 8] = input[..8].try_into().expect("length checked");
    *input = &input[8..];
    Ok(f64::from_le_bytes(bytes))
}

#[inline]
pub fn read_bytes(input: &mut &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = read_long(input)?;
    if len < 0 {
        return Err(CodecError::NegativeLength(len));
    }
    let len = len as usize;
    if input.len() < len {
        return Err(CodecError::UnexpectedEof);
    }
    let out = input[..len].to_vec();
    *input = &input[len..];
    Ok(out)
}

#[inline]
pub fn read_string(input: &mut &[u8]) -> Result<String, CodecError> {
    let bytes = read_bytes(input)?;
    String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
}

/// Read exactly `size` raw bytes.
#[inline]
pub fn read_fixed(input: &mut &[u8], size: usize) -> Result<Vec<u8>, CodecError> {
    if input.len() < size {
        return Err(CodecError::UnexpectedEof);
    }
    let out = input[..size].to_vec();
    *input = &input[size..];
    Ok(out)
}
