//! Primitive encoding/decoding for the storage format.
//!
//! Implements varints, fixed-width big-endian integers and the sign-flip
//! transform that keeps signed integers byte-sortable.

use crate::error::DecodeError;
use crate::limits::MAX_VARINT_BYTES;

// =============================================================================
// DECODING
// =============================================================================

/// Reader for decoding binary data.
///
/// Wraps a byte slice and provides methods for reading primitives
/// with bounds checking and error handling.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Creates a reader positioned at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            pos: offset.min(data.len()),
        }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        if self.pos >= self.data.len() {
            return Err(DecodeError::UnexpectedEof { context });
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads exactly N bytes into an array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, context)?);
        Ok(out)
    }

    /// Consumes and returns all remaining bytes.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    /// Reads an unsigned varint (LEB128).
    #[inline]
    pub fn read_varint(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0;

        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte(context)?;
            let value = (byte & 0x7F) as u64;

            if shift >= 64 || (shift == 63 && value > 1) {
                return Err(DecodeError::VarintOverflow);
            }

            result |= value << shift;

            if byte & 0x80 == 0 {
                // Qualifiers compare bytewise, so every value has one encoding.
                if byte == 0 && i > 0 {
                    return Err(DecodeError::NonCanonicalVarint);
                }
                return Ok(result);
            }
            shift += 7;

            if i == MAX_VARINT_BYTES - 1 {
                return Err(DecodeError::VarintTooLong);
            }
        }

        Err(DecodeError::VarintTooLong)
    }

    /// Reads a big-endian u16.
    pub fn read_u16_be(&mut self, context: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array(context)?))
    }

    /// Reads a big-endian u32.
    pub fn read_u32_be(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array(context)?))
    }

    /// Reads a big-endian u64.
    pub fn read_u64_be(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.read_array(context)?))
    }

    /// Reads a sign-flipped big-endian i32.
    pub fn read_i32_sortable(&mut self, context: &'static str) -> Result<i32, DecodeError> {
        Ok(unflip_i32(self.read_u32_be(context)?))
    }

    /// Reads a sign-flipped big-endian i64.
    pub fn read_i64_sortable(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        Ok(unflip_i64(self.read_u64_be(context)?))
    }

    /// Reads a varint length prefix followed by that many bytes.
    pub fn read_bytes_prefixed(
        &mut self,
        max_len: usize,
        field: &'static str,
    ) -> Result<&'a [u8], DecodeError> {
        let len = self.read_varint(field)? as usize;
        if len > max_len {
            return Err(DecodeError::LengthExceedsLimit {
                field,
                len,
                max: max_len,
            });
        }
        self.read_bytes(len, field)
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes an unsigned varint (LEB128).
    #[inline]
    pub fn write_varint(&mut self, mut value: u64) {
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf[len] = byte;
            len += 1;
            if value == 0 {
                break;
            }
        }
        self.buf.extend_from_slice(&buf[..len]);
    }

    /// Writes a big-endian u16.
    pub fn write_u16_be(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a big-endian u32.
    pub fn write_u32_be(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a big-endian u64.
    pub fn write_u64_be(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an i32 so that byte order equals numeric order.
    pub fn write_i32_sortable(&mut self, value: i32) {
        self.write_u32_be(flip_i32(value));
    }

    /// Writes an i64 so that byte order equals numeric order.
    pub fn write_i64_sortable(&mut self, value: i64) {
        self.write_u64_be(flip_i64(value));
    }

    /// Writes a varint length prefix followed by the bytes.
    pub fn write_bytes_prefixed(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }
}

// =============================================================================
// SIGN FLIP
// =============================================================================

const SIGN_FLIP_32: u32 = 1 << 31;
const SIGN_FLIP_64: u64 = 1 << 63;

#[inline]
fn flip_i32(value: i32) -> u32 {
    value as u32 ^ SIGN_FLIP_32
}

#[inline]
fn unflip_i32(raw: u32) -> i32 {
    (raw ^ SIGN_FLIP_32) as i32
}

#[inline]
fn flip_i64(value: i64) -> u64 {
    value as u64 ^ SIGN_FLIP_64
}

#[inline]
fn unflip_i64(raw: u64) -> i64 {
    (raw ^ SIGN_FLIP_64) as i64
}

/// Maps an f64 to bits whose unsigned order equals the float's total order.
#[inline]
pub fn f64_to_sortable(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits & SIGN_FLIP_64 != 0 {
        !bits
    } else {
        bits | SIGN_FLIP_64
    }
}

/// Inverse of [`f64_to_sortable`].
#[inline]
pub fn f64_from_sortable(raw: u64) -> f64 {
    if raw & SIGN_FLIP_64 != 0 {
        f64::from_bits(raw & !SIGN_FLIP_64)
    } else {
        f64::from_bits(!raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let test_values = [0u64, 1, 127, 128, 255, 256, 16383, 16384, u64::MAX];

        for v in test_values {
            let mut writer = Writer::new();
            writer.write_varint(v);

            let mut reader = Reader::new(writer.as_bytes());
            let decoded = reader.read_varint("test").unwrap();
            assert_eq!(v, decoded, "failed for {}", v);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_sortable_integers_keep_order() {
        let values = [i64::MIN, -1_000_000, -1, 0, 1, 42, i64::MAX];
        let encoded: Vec<Vec<u8>> = values
            .iter()
            .map(|v| {
                let mut w = Writer::new();
                w.write_i64_sortable(*v);
                w.into_bytes()
            })
            .collect();
        assert!(encoded.windows(2).all(|w| w[0] < w[1]));

        for (v, bytes) in values.iter().zip(&encoded) {
            assert_eq!(Reader::new(bytes).read_i64_sortable("test").unwrap(), *v);
        }
    }

    #[test]
    fn test_sortable_i32() {
        let mut w = Writer::new();
        w.write_i32_sortable(-1);
        w.write_i32_sortable(0);
        let bytes = w.into_bytes();
        assert_eq!(bytes, [0x7F, 0xFF, 0xFF, 0xFF, 0x80, 0x00, 0x00, 0x00]);
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_i32_sortable("a").unwrap(), -1);
        assert_eq!(r.read_i32_sortable("b").unwrap(), 0);
    }

    #[test]
    fn test_sortable_floats_keep_order() {
        let values = [f64::NEG_INFINITY, -2.5, -0.0, 0.0, 1e-10, 3.25, f64::INFINITY];
        let raw: Vec<u64> = values.iter().map(|v| f64_to_sortable(*v)).collect();
        assert!(raw.windows(2).all(|w| w[0] < w[1]));
        for (v, r) in values.iter().zip(raw) {
            assert_eq!(f64_from_sortable(r).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn test_varint_too_long() {
        let data = [0x80u8; 11];
        let mut reader = Reader::new(&data);
        let result = reader.read_varint("test");
        assert!(matches!(result, Err(DecodeError::VarintTooLong)));
    }

    #[test]
    fn test_varint_overlong_zero_rejected() {
        let mut reader = Reader::new(&[0x89, 0x00]);
        assert_eq!(reader.read_varint("test"), Err(DecodeError::NonCanonicalVarint));

        let mut reader = Reader::new(&[0x80, 0x01]);
        assert_eq!(reader.read_varint("test"), Ok(128));

        let mut reader = Reader::new(&[0x00]);
        assert_eq!(reader.read_varint("test"), Ok(0));
    }

    #[test]
    fn test_prefixed_too_long() {
        let mut writer = Writer::new();
        writer.write_varint(1000);
        writer.write_bytes(&[0u8; 1000]);

        let mut reader = Reader::new(writer.as_bytes());
        let result = reader.read_bytes_prefixed(100, "test");
        assert!(matches!(
            result,
            Err(DecodeError::LengthExceedsLimit { max: 100, .. })
        ));
    }

    #[test]
    fn test_unexpected_eof() {
        let data = [0u8; 5];
        let mut reader = Reader::new(&data);
        assert!(matches!(
            reader.read_bytes(10, "test"),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            reader.read_u64_be("test"),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }
}
