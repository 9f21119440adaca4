//! Scalar storage byte encodings.
//!
//! Every fixed-width encoding preserves order: comparing the encoded bytes
//! lexicographically gives the same result as comparing the values.
//! Variable length values (text, bytes) take the rest of a record; inside a
//! qualifier they carry a varint length prefix.

use uuid::Uuid;

use crate::codec::primitives::{f64_from_sortable, f64_to_sortable, Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_QUALIFIER_LEN;
use crate::model::{Date, DateTime, Time, Value, ValueType};

// =============================================================================
// DECODING
// =============================================================================

/// Reads a value of `value_type` spanning exactly `length` bytes.
pub fn read_storage_bytes(
    reader: &mut Reader<'_>,
    value_type: ValueType,
    length: usize,
) -> Result<Value, DecodeError> {
    if let Some(size) = value_type.byte_size() {
        if length < size {
            return Err(DecodeError::UnexpectedEof {
                context: "fixed size value",
            });
        }
        if length > size {
            return Err(DecodeError::TrailingBytes {
                context: "fixed size value",
                len: length - size,
            });
        }
    }

    let value = match value_type {
        ValueType::Bool => {
            let byte = reader.read_byte("bool")?;
            match byte {
                0x00 => Value::Bool(false),
                0x01 => Value::Bool(true),
                _ => return Err(DecodeError::InvalidBool { value: byte }),
            }
        }
        ValueType::Int32 => Value::Int32(reader.read_i32_sortable("int32")?),
        ValueType::Int64 => Value::Int64(reader.read_i64_sortable("int64")?),
        ValueType::UInt32 => Value::UInt32(reader.read_u32_be("uint32")?),
        ValueType::UInt64 => Value::UInt64(reader.read_u64_be("uint64")?),
        ValueType::Float64 => Value::Float64(f64_from_sortable(reader.read_u64_be("float64")?)),
        ValueType::Text => {
            let bytes = reader.read_bytes(length, "text")?;
            let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { field: "text" })?;
            Value::Text(text.to_string())
        }
        ValueType::Bytes => Value::Bytes(reader.read_bytes(length, "bytes")?.to_vec()),
        ValueType::Date => Value::Date(Date {
            days: reader.read_i32_sortable("date")?,
        }),
        ValueType::Time => Value::Time(Time {
            millis: reader.read_u32_be("time")?,
        }),
        ValueType::DateTime => Value::DateTime(DateTime {
            epoch_millis: reader.read_i64_sortable("date_time")?,
        }),
        ValueType::Enum => Value::Enum(reader.read_u16_be("enum")?),
        ValueType::Uuid => Value::Uuid(Uuid::from_bytes(reader.read_array("uuid")?)),
    };
    Ok(value)
}

/// Decodes a value from a slice that holds exactly its storage bytes.
pub fn decode_storage_bytes(value_type: ValueType, bytes: &[u8]) -> Result<Value, DecodeError> {
    let mut reader = Reader::new(bytes);
    read_storage_bytes(&mut reader, value_type, bytes.len())
}

/// Reads a value as embedded in a qualifier (length-prefixed when variable).
pub fn read_qualifier_bytes(reader: &mut Reader<'_>, value_type: ValueType) -> Result<Value, DecodeError> {
    match value_type.byte_size() {
        Some(size) => read_storage_bytes(reader, value_type, size),
        None => {
            let bytes = reader.read_bytes_prefixed(MAX_QUALIFIER_LEN, "qualifier value")?;
            decode_storage_bytes(value_type, bytes)
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writes the storage bytes of a value.
pub fn write_storage_bytes(writer: &mut Writer, value: &Value) {
    match value {
        Value::Bool(v) => writer.write_byte(u8::from(*v)),
        Value::Int32(v) => writer.write_i32_sortable(*v),
        Value::Int64(v) => writer.write_i64_sortable(*v),
        Value::UInt32(v) => writer.write_u32_be(*v),
        Value::UInt64(v) => writer.write_u64_be(*v),
        Value::Float64(v) => writer.write_u64_be(f64_to_sortable(*v)),
        Value::Text(v) => writer.write_bytes(v.as_bytes()),
        Value::Bytes(v) => writer.write_bytes(v),
        Value::Date(d) => writer.write_i32_sortable(d.days),
        Value::Time(t) => writer.write_u32_be(t.millis),
        Value::DateTime(dt) => writer.write_i64_sortable(dt.epoch_millis),
        Value::Enum(v) => writer.write_u16_be(*v),
        Value::Uuid(v) => writer.write_bytes(v.as_bytes()),
    }
}

/// Returns the storage bytes of a value.
pub fn encode_storage_bytes(value: &Value) -> Vec<u8> {
    let mut writer = Writer::with_capacity(value.value_type().byte_size().unwrap_or(16));
    write_storage_bytes(&mut writer, value);
    writer.into_bytes()
}

/// Writes a value as embedded in a qualifier (length-prefixed when variable).
pub fn write_qualifier_bytes(writer: &mut Writer, value: &Value) {
    if value.value_type().is_fixed_size() {
        write_storage_bytes(writer, value);
    } else {
        writer.write_bytes_prefixed(&encode_storage_bytes(value));
    }
}

/// Fails unless `value` is of the `expected` type.
pub fn check_type(value: &Value, expected: ValueType) -> Result<(), EncodeError> {
    let found = value.value_type();
    if found != expected {
        return Err(EncodeError::TypeMismatch { expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(value: Value) {
        let bytes = encode_storage_bytes(&value);
        if let Some(size) = value.value_type().byte_size() {
            assert_eq!(bytes.len(), size, "width of {:?}", value);
        }
        let decoded = decode_storage_bytes(value.value_type(), &bytes).unwrap();
        assert_eq!(value, decoded);

        let mut writer = Writer::new();
        write_qualifier_bytes(&mut writer, &value);
        let mut reader = Reader::new(writer.as_bytes());
        assert_eq!(read_qualifier_bytes(&mut reader, value.value_type()).unwrap(), value);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_scalar_roundtrips() {
        roundtrip(Value::Bool(true));
        roundtrip(Value::Int32(-5));
        roundtrip(Value::Int64(i64::MIN));
        roundtrip(Value::UInt32(7));
        roundtrip(Value::UInt64(u64::MAX));
        roundtrip(Value::Float64(-3.5));
        roundtrip(Value::text("hello world"));
        roundtrip(Value::text(""));
        roundtrip(Value::Bytes(vec![0, 1, 2]));
        roundtrip(Value::date(1981, 12, 5));
        roundtrip(Value::Time(Time::new(12, 33, 23)));
        roundtrip(Value::date_time(2018, 12, 8, 12, 33, 23));
        roundtrip(Value::Enum(3));
        roundtrip(Value::Uuid(Uuid::from_bytes([9u8; 16])));
    }

    #[test]
    fn test_text_is_raw_utf8() {
        assert_eq!(encode_storage_bytes(&Value::text("hello world")), b"hello world");

        let mut writer = Writer::new();
        write_qualifier_bytes(&mut writer, &Value::text("ab"));
        assert_eq!(writer.as_bytes(), &[2, b'a', b'b']);
    }

    #[test]
    fn test_fixed_size_length_checked() {
        assert!(matches!(
            decode_storage_bytes(ValueType::UInt32, &[0, 0, 0]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            decode_storage_bytes(ValueType::Bool, &[1, 0]),
            Err(DecodeError::TrailingBytes { len: 1, .. })
        ));
        assert!(matches!(
            decode_storage_bytes(ValueType::Bool, &[2]),
            Err(DecodeError::InvalidBool { value: 2 })
        ));
        assert!(matches!(
            decode_storage_bytes(ValueType::Text, &[0xff, 0xfe]),
            Err(DecodeError::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_date_time_bytes() {
        let bytes = encode_storage_bytes(&Value::date_time(2018, 12, 8, 12, 33, 23));
        let expected = (1_544_272_403_000i64 as u64 ^ (1 << 63)).to_be_bytes();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_check_type() {
        assert!(check_type(&Value::Int64(1), ValueType::Int64).is_ok());
        assert_eq!(
            check_type(&Value::Int32(1), ValueType::Int64),
            Err(EncodeError::TypeMismatch {
                expected: ValueType::Int64,
                found: ValueType::Int32
            })
        );
    }

    proptest! {
        #[test]
        fn prop_int64_order_preserved(a: i64, b: i64) {
            let ea = encode_storage_bytes(&Value::Int64(a));
            let eb = encode_storage_bytes(&Value::Int64(b));
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        #[test]
        fn prop_date_time_order_preserved(a: i64, b: i64) {
            let ea = encode_storage_bytes(&Value::DateTime(DateTime { epoch_millis: a }));
            let eb = encode_storage_bytes(&Value::DateTime(DateTime { epoch_millis: b }));
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        #[test]
        fn prop_float_order_preserved(a in -1e300f64..1e300, b in -1e300f64..1e300) {
            let ea = encode_storage_bytes(&Value::Float64(a));
            let eb = encode_storage_bytes(&Value::Float64(b));
            prop_assert_eq!(a.total_cmp(&b), ea.cmp(&eb));
        }
    }
}
