//! Key and index definitions.
//!
//! A key is the concatenation of the storage bytes of its parts. Reversed
//! parts store the bitwise NOT of their bytes so they sort descending. In an
//! index, variable width parts carry a varint length prefix; keys only allow
//! fixed width parts.

use crate::codec::primitives::{Reader, Writer};
use crate::codec::value::{check_type, encode_storage_bytes};
use crate::error::{DecodeError, EncodeError, SchemaError};
use crate::limits::MAX_KEY_PARTS;
use crate::model::{
    ObjectValues, PropertyKind, PropertyReference, PropertyValue, ReferenceSegment, Schema, Value, ValueType,
};

/// One part of a key: a top-level scalar property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPart {
    pub index: u32,
    pub value_type: ValueType,
    pub reversed: bool,
}

impl KeyPart {
    pub fn new(index: u32, value_type: ValueType) -> Self {
        Self {
            index,
            value_type,
            reversed: false,
        }
    }

    /// A part sorting in descending value order.
    pub fn reversed(index: u32, value_type: ValueType) -> Self {
        Self {
            index,
            value_type,
            reversed: true,
        }
    }

    /// A part for property `index` of `schema`, typed from its definition.
    pub fn from_schema(schema: &Schema, index: u32, reversed: bool) -> Result<Self, SchemaError> {
        match schema.property(index).map(|def| &def.kind) {
            Some(PropertyKind::Value(value_type)) => Ok(Self {
                index,
                value_type: *value_type,
                reversed,
            }),
            _ => Err(SchemaError::InvalidKeyPart { index }),
        }
    }

    /// Reference of the property this part reads.
    pub fn reference(&self) -> PropertyReference {
        PropertyReference::property(self.index)
    }

    /// Stored bytes of `value` in this part, without any length prefix.
    pub fn value_bytes(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        check_type(value, self.value_type)?;
        let mut bytes = encode_storage_bytes(value);
        if self.reversed {
            invert(&mut bytes);
        }
        Ok(bytes)
    }
}

/// Inverts bytes in place, turning ascending order into descending.
pub fn invert(bytes: &mut [u8]) {
    for b in bytes {
        *b = !*b;
    }
}

/// The ordered parts of a key or index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    parts: Vec<KeyPart>,
    is_index: bool,
}

impl KeyDefinition {
    /// A primary key: every part has a fixed width.
    pub fn key(parts: Vec<KeyPart>) -> Result<Self, SchemaError> {
        check_part_count(&parts)?;
        if let Some(part) = parts.iter().position(|p| !p.value_type.is_fixed_size()) {
            return Err(SchemaError::VariableKeyPart { part });
        }
        Ok(Self { parts, is_index: false })
    }

    /// A secondary index: variable width parts are length prefixed.
    pub fn index(parts: Vec<KeyPart>) -> Result<Self, SchemaError> {
        check_part_count(&parts)?;
        Ok(Self { parts, is_index: true })
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Returns the position of the part reading `reference`.
    pub fn part_for(&self, reference: &PropertyReference) -> Option<usize> {
        match reference.segments() {
            [ReferenceSegment::Property(index)] => self.parts.iter().position(|p| p.index == *index),
            _ => None,
        }
    }

    /// True when the part is written with a length prefix.
    pub fn is_prefixed(&self, part: usize) -> bool {
        self.is_index && self.parts.get(part).is_some_and(|p| !p.value_type.is_fixed_size())
    }

    /// Byte offset of `part`, when every earlier part has a fixed width.
    pub fn byte_offset(&self, part: usize) -> Option<usize> {
        self.parts[..part.min(self.parts.len())]
            .iter()
            .map(|p| p.value_type.byte_size())
            .sum()
    }

    /// Appends the encoded form of `value` in `part`.
    pub fn write_part(&self, writer: &mut Writer, part: usize, value: &Value) -> Result<(), EncodeError> {
        let key_part = self.parts.get(part).ok_or(EncodeError::MissingKeyValue { part })?;
        let bytes = key_part.value_bytes(value)?;
        if self.is_prefixed(part) {
            writer.write_bytes_prefixed(&bytes);
        } else {
            writer.write_bytes(&bytes);
        }
        Ok(())
    }

    /// Builds the key of an object.
    pub fn encode(&self, values: &ObjectValues) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::new();
        for (part, key_part) in self.parts.iter().enumerate() {
            match values.get(key_part.index) {
                Some(PropertyValue::Value(value)) => self.write_part(&mut writer, part, value)?,
                _ => return Err(EncodeError::MissingKeyValue { part }),
            }
        }
        Ok(writer.into_bytes())
    }

    /// Splits a key into the stored bytes of each part.
    pub fn split<'k>(&self, key: &'k [u8]) -> Result<Vec<&'k [u8]>, DecodeError> {
        let mut reader = Reader::new(key);
        let mut parts = Vec::with_capacity(self.parts.len());
        for (i, part) in self.parts.iter().enumerate() {
            let bytes = match part.value_type.byte_size() {
                Some(size) => reader.read_bytes(size, "key part")?,
                None if self.is_prefixed(i) => reader.read_bytes_prefixed(key.len(), "key part")?,
                None => reader.read_rest(),
            };
            parts.push(bytes);
        }
        if !reader.is_empty() {
            return Err(DecodeError::TrailingBytes {
                context: "key",
                len: reader.remaining_len(),
            });
        }
        Ok(parts)
    }
}

fn check_part_count(parts: &[KeyPart]) -> Result<(), SchemaError> {
    if parts.is_empty() {
        return Err(SchemaError::EmptyKey);
    }
    if parts.len() > MAX_KEY_PARTS {
        return Err(SchemaError::TooManyKeyParts {
            count: parts.len(),
            max: MAX_KEY_PARTS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_requires_fixed_parts() {
        assert_eq!(
            KeyDefinition::key(vec![KeyPart::new(1, ValueType::Uuid), KeyPart::new(2, ValueType::Text)]),
            Err(SchemaError::VariableKeyPart { part: 1 })
        );
        assert_eq!(KeyDefinition::key(vec![]), Err(SchemaError::EmptyKey));
        assert!(KeyDefinition::index(vec![KeyPart::new(2, ValueType::Text)]).is_ok());
    }

    #[test]
    fn test_encode_and_split() {
        let key = KeyDefinition::key(vec![
            KeyPart::new(1, ValueType::UInt32),
            KeyPart::reversed(2, ValueType::Bool),
        ])
        .unwrap();
        let values = ObjectValues::new().with(1, Value::UInt32(7)).with(2, Value::Bool(true));

        let bytes = key.encode(&values).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 7, 0xfe]);
        assert_eq!(key.split(&bytes).unwrap(), vec![&[0u8, 0, 0, 7][..], &[0xfeu8][..]]);
        assert_eq!(key.byte_offset(1), Some(4));

        assert_eq!(
            key.encode(&ObjectValues::new().with(1, Value::UInt32(7))),
            Err(EncodeError::MissingKeyValue { part: 1 })
        );
    }

    #[test]
    fn test_index_prefixes_variable_parts() {
        let index = KeyDefinition::index(vec![
            KeyPart::new(1, ValueType::Text),
            KeyPart::new(2, ValueType::Enum),
        ])
        .unwrap();
        let values = ObjectValues::new().with(1, Value::text("ab")).with(2, Value::Enum(1));

        let bytes = index.encode(&values).unwrap();
        assert_eq!(bytes, vec![2, b'a', b'b', 0, 1]);
        assert_eq!(index.split(&bytes).unwrap(), vec![&b"ab"[..], &[0u8, 1][..]]);
        assert_eq!(index.byte_offset(1), None);
    }

    #[test]
    fn test_part_from_schema() {
        let schema = Schema::builder("Test")
            .value(1, "at", ValueType::DateTime)
            .list(2, "tags", ValueType::Text)
            .build()
            .unwrap();
        assert_eq!(
            KeyPart::from_schema(&schema, 1, true).unwrap(),
            KeyPart::reversed(1, ValueType::DateTime)
        );
        assert!(KeyPart::from_schema(&schema, 2, false).is_err());
        assert!(KeyPart::from_schema(&schema, 3, false).is_err());
    }
}
