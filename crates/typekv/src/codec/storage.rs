//! Stored value records.
//!
//! A record is `[u64 BE version][payload]`. The payload layout depends on the
//! cell the qualifier addresses:
//!
//! | Cell                 | Payload                                      |
//! |----------------------|----------------------------------------------|
//! | scalar, list item    | storage bytes of the value                   |
//! | collection size      | varint cardinality                           |
//! | multi-type           | `varint(tag << 1 \| complex)` + value bytes  |
//! | embedded presence    | `0x01`                                       |
//! | set item             | `0x01`                                       |
//!
//! An empty payload is always a deletion at that version.

use crate::codec::primitives::{Reader, Writer};
use crate::codec::value::{read_storage_bytes, write_storage_bytes};
use crate::error::DecodeError;
use crate::limits::{MAX_TYPE_TAG, VERSION_BYTES};
use crate::model::{TypedValue, ValueType};

/// Version of a stored record.
pub type Version = u64;

/// Payload marking an embedded object as present.
pub const EMBED_PRESENT: u8 = 0x01;

/// Payload marking a set item as present.
pub const SET_ITEM_PRESENT: u8 = 0x01;

/// Splits a record into its version and payload.
pub fn read_version(record: &[u8]) -> Result<(Version, &[u8]), DecodeError> {
    if record.len() < VERSION_BYTES {
        return Err(DecodeError::UnexpectedEof { context: "version" });
    }
    let (version, payload) = record.split_at(VERSION_BYTES);
    let mut bytes = [0u8; VERSION_BYTES];
    bytes.copy_from_slice(version);
    Ok((u64::from_be_bytes(bytes), payload))
}

/// Builds a record from a version and payload.
pub fn encode_record(version: Version, payload: &[u8]) -> Vec<u8> {
    let mut writer = Writer::with_capacity(VERSION_BYTES + payload.len());
    writer.write_u64_be(version);
    writer.write_bytes(payload);
    writer.into_bytes()
}

/// Encodes a collection size marker.
pub fn encode_size(count: u64) -> Vec<u8> {
    let mut writer = Writer::with_capacity(4);
    writer.write_varint(count);
    writer.into_bytes()
}

/// Decodes a collection size marker. The whole payload must be consumed.
pub fn decode_size(payload: &[u8]) -> Result<u64, DecodeError> {
    let mut reader = Reader::new(payload);
    let count = reader.read_varint("collection size")?;
    expect_consumed(&reader, "collection size")?;
    Ok(count)
}

/// Decodes a `varint(tag << 1 | complex)` discriminator.
pub fn read_type_tag(reader: &mut Reader<'_>) -> Result<(u32, bool), DecodeError> {
    let raw = reader.read_varint("type tag")?;
    let tag = raw >> 1;
    if tag > MAX_TYPE_TAG as u64 {
        return Err(DecodeError::UnknownTypeTag {
            tag: u32::try_from(tag).unwrap_or(u32::MAX),
        });
    }
    Ok((tag as u32, raw & 1 == 1))
}

/// Writes a `varint(tag << 1 | complex)` discriminator.
pub fn write_type_tag(writer: &mut Writer, tag: u32, complex: bool) {
    writer.write_varint(((tag as u64) << 1) | u64::from(complex));
}

/// Encodes a multi-type payload.
pub fn encode_typed_value(typed: &TypedValue) -> Vec<u8> {
    let mut writer = Writer::new();
    write_type_tag(&mut writer, typed.tag, typed.value.is_none());
    if let Some(value) = &typed.value {
        write_storage_bytes(&mut writer, value);
    }
    writer.into_bytes()
}

/// Decodes a multi-type payload. `value_type_of` maps a tag to the scalar
/// type of a simple variant; it is only consulted for non-complex tags.
pub fn decode_typed_value(
    payload: &[u8],
    value_type_of: impl FnOnce(u32) -> Result<ValueType, DecodeError>,
) -> Result<TypedValue, DecodeError> {
    let mut reader = Reader::new(payload);
    let (tag, complex) = read_type_tag(&mut reader)?;
    if complex {
        expect_consumed(&reader, "complex type value")?;
        return Ok(TypedValue::complex(tag));
    }
    let value_type = value_type_of(tag)?;
    let length = reader.remaining_len();
    let value = read_storage_bytes(&mut reader, value_type, length)?;
    Ok(TypedValue {
        tag,
        value: Some(value),
    })
}

/// Returns true when an embedded presence payload marks the object as existing.
pub fn embed_is_present(payload: &[u8]) -> Result<bool, DecodeError> {
    match payload {
        [] | [0x00] => Ok(false),
        [EMBED_PRESENT] => Ok(true),
        _ => Err(DecodeError::MalformedEncoding {
            context: "embedded presence",
        }),
    }
}

fn expect_consumed(reader: &Reader<'_>, context: &'static str) -> Result<(), DecodeError> {
    if reader.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::TrailingBytes {
            context,
            len: reader.remaining_len(),
        })
    }
}
