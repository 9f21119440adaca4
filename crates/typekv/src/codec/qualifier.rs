//! Qualifier encoding/decoding.
//!
//! A qualifier addresses one storage cell of an object:
//!
//! ```text
//! varint(index << 3 | kind)   property header
//! [sub-address]               list index (u32 BE), set item, map key,
//!                             type header, or a nested property header
//! ```
//!
//! A `Special` header is followed by one complete-reference-type byte. The
//! object soft delete marker is the whole qualifier `[0x00, 0x00]`.

use crate::codec::primitives::{Reader, Writer};
use crate::codec::value::{check_type, read_qualifier_bytes, write_qualifier_bytes};
use crate::error::{DecodeError, EncodeError, ReadError};
use crate::limits::{MAX_QUALIFIER_LEN, TYPE_TAG_BITS, TYPE_TAG_MASK};
use crate::model::{PropertyKind, PropertyReference, ReferenceSegment, Schema};

/// Structural tag stored in the low bits of a qualifier header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReferenceKind {
    Special = 0,
    Value = 1,
    Embed = 2,
    List = 3,
    Set = 4,
    Map = 5,
    Type = 6,
}

impl ReferenceKind {
    /// Creates a ReferenceKind from its tag bits.
    pub fn from_tag(tag: u8) -> Result<ReferenceKind, DecodeError> {
        match tag {
            0 => Ok(ReferenceKind::Special),
            1 => Ok(ReferenceKind::Value),
            2 => Ok(ReferenceKind::Embed),
            3 => Ok(ReferenceKind::List),
            4 => Ok(ReferenceKind::Set),
            5 => Ok(ReferenceKind::Map),
            6 => Ok(ReferenceKind::Type),
            _ => Err(DecodeError::InvalidReferenceKind { tag }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ReferenceKind::Special => "special",
            ReferenceKind::Value => "value",
            ReferenceKind::Embed => "embed",
            ReferenceKind::List => "list",
            ReferenceKind::Set => "set",
            ReferenceKind::Map => "map",
            ReferenceKind::Type => "type",
        }
    }
}

/// Sub type written after a `Special` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompleteReferenceType {
    /// Object soft delete marker.
    ObjectDelete = 0,
    /// Reference to a map key itself, followed by the key bytes.
    MapKey = 1,
    /// Reference to the type discriminator of a multi-type property.
    TypeOf = 2,
}

impl CompleteReferenceType {
    pub fn from_u8(value: u8) -> Result<CompleteReferenceType, DecodeError> {
        match value {
            0 => Ok(CompleteReferenceType::ObjectDelete),
            1 => Ok(CompleteReferenceType::MapKey),
            2 => Ok(CompleteReferenceType::TypeOf),
            _ => Err(DecodeError::InvalidSpecialType { value }),
        }
    }
}

/// Qualifier of the object soft delete marker.
pub const SOFT_DELETE_QUALIFIER: [u8; 2] = [0x00, CompleteReferenceType::ObjectDelete as u8];

/// Returns true for the object soft delete qualifier.
pub fn is_soft_delete_qualifier(qualifier: &[u8]) -> bool {
    qualifier == SOFT_DELETE_QUALIFIER
}

// =============================================================================
// HEADERS
// =============================================================================

/// Reads a property header from the reader.
pub fn read_header(reader: &mut Reader<'_>) -> Result<(u32, ReferenceKind), DecodeError> {
    let raw = reader.read_varint("qualifier header")?;
    let kind = ReferenceKind::from_tag((raw & TYPE_TAG_MASK) as u8)?;
    let index = raw >> TYPE_TAG_BITS;
    let index = u32::try_from(index).map_err(|_| DecodeError::IndexTooLarge { index })?;
    Ok((index, kind))
}

/// Decodes the header at `offset`, returning index, kind and bytes consumed.
pub fn decode_header(qualifier: &[u8], offset: usize) -> Result<(u32, ReferenceKind, usize), DecodeError> {
    let mut reader = Reader::at(qualifier, offset);
    let (index, kind) = read_header(&mut reader)?;
    Ok((index, kind, reader.position() - offset))
}

/// Writes a property header.
pub fn write_header(writer: &mut Writer, index: u32, kind: ReferenceKind) {
    writer.write_varint(((index as u64) << TYPE_TAG_BITS) | kind as u64);
}

/// Returns the bytes of a property header.
pub fn encode_header(index: u32, kind: ReferenceKind) -> Vec<u8> {
    let mut writer = Writer::with_capacity(5);
    write_header(&mut writer, index, kind);
    writer.into_bytes()
}

/// True when nothing follows `offset`: the qualifier addresses the property
/// itself rather than a nested element.
pub fn is_at_end(qualifier: &[u8], offset: usize) -> bool {
    offset >= qualifier.len()
}

/// Reads the complete reference type byte following a `Special` header.
pub fn read_complete_reference_type(reader: &mut Reader<'_>) -> Result<CompleteReferenceType, DecodeError> {
    CompleteReferenceType::from_u8(reader.read_byte("complete reference type")?)
}

// =============================================================================
// REFERENCES
// =============================================================================

/// Position while walking a reference against the schema.
#[derive(Clone, Copy)]
enum Position<'s> {
    /// Expecting a property of this schema.
    Object(&'s Schema),
    /// Inside a property of this kind.
    Inside(&'s PropertyKind),
    /// Nothing may follow.
    End,
}

/// Encodes a property reference as a qualifier.
pub fn encode_reference(schema: &Schema, reference: &PropertyReference) -> Result<Vec<u8>, EncodeError> {
    let segments = reference.segments();
    if segments.is_empty() {
        return Err(EncodeError::InvalidReference { context: "empty reference" });
    }

    let mut writer = Writer::new();
    let mut position = Position::Object(schema);

    for (i, segment) in segments.iter().enumerate() {
        let next = segments.get(i + 1);
        position = match (segment, position) {
            (ReferenceSegment::Property(index), Position::Object(object)) => {
                write_property_header(&mut writer, object, *index, next)?
            }
            (ReferenceSegment::Property(index), Position::Inside(PropertyKind::Embed(object))) => {
                write_property_header(&mut writer, object, *index, next)?
            }
            (ReferenceSegment::ListItem(index), Position::Inside(PropertyKind::List(item))) => {
                writer.write_u32_be(*index);
                Position::Inside(item)
            }
            (ReferenceSegment::SetItem(value), Position::Inside(PropertyKind::Set(item_type))) => {
                check_type(value, *item_type)?;
                write_qualifier_bytes(&mut writer, value);
                Position::End
            }
            (ReferenceSegment::MapValue(key), Position::Inside(PropertyKind::Map { key: key_type, value })) => {
                check_type(key, *key_type)?;
                write_qualifier_bytes(&mut writer, key);
                Position::Inside(value)
            }
            (ReferenceSegment::MapKey(key), Position::Inside(PropertyKind::Map { key: key_type, .. }))
                if follows_property(segments, i) =>
            {
                check_type(key, *key_type)?;
                writer.write_byte(CompleteReferenceType::MapKey as u8);
                write_qualifier_bytes(&mut writer, key);
                Position::End
            }
            (ReferenceSegment::TypeOf, Position::Inside(PropertyKind::MultiType(_))) if follows_property(segments, i) => {
                writer.write_byte(CompleteReferenceType::TypeOf as u8);
                Position::End
            }
            (ReferenceSegment::TypeCase(tag), Position::Inside(kind @ PropertyKind::MultiType(_))) => {
                let case = kind
                    .type_case(*tag)
                    .ok_or(EncodeError::InvalidReference { context: "unknown type tag" })?;
                write_header(&mut writer, *tag, ReferenceKind::Type);
                Position::Inside(&case.kind)
            }
            _ => {
                return Err(EncodeError::InvalidReference {
                    context: "segment does not match property definition",
                });
            }
        };
    }

    Ok(writer.into_bytes())
}

fn write_property_header<'s>(
    writer: &mut Writer,
    object: &'s Schema,
    index: u32,
    next: Option<&ReferenceSegment>,
) -> Result<Position<'s>, EncodeError> {
    let def = object.property(index).ok_or(EncodeError::UnknownProperty { index })?;
    let kind = match next {
        Some(ReferenceSegment::MapKey(_)) | Some(ReferenceSegment::TypeOf) => ReferenceKind::Special,
        _ => def.kind.reference_kind(),
    };
    write_header(writer, index, kind);
    Ok(Position::Inside(&def.kind))
}

fn follows_property(segments: &[ReferenceSegment], i: usize) -> bool {
    i > 0 && matches!(segments[i - 1], ReferenceSegment::Property(_))
}

/// Decodes a qualifier back into a property reference.
pub fn decode_reference(schema: &Schema, qualifier: &[u8]) -> Result<PropertyReference, ReadError> {
    if qualifier.len() > MAX_QUALIFIER_LEN {
        return Err(DecodeError::LengthExceedsLimit {
            field: "qualifier",
            len: qualifier.len(),
            max: MAX_QUALIFIER_LEN,
        }
        .into());
    }
    if qualifier.is_empty() {
        return Err(DecodeError::UnexpectedEof { context: "qualifier header" }.into());
    }
    if is_soft_delete_qualifier(qualifier) {
        return Err(ReadError::UnsupportedStructure {
            context: "object delete marker is not a property reference",
        });
    }

    let mut reader = Reader::new(qualifier);
    let mut segments = Vec::new();
    let mut position = Position::Object(schema);

    while !reader.is_empty() {
        position = match position {
            Position::Object(object) => {
                let (index, kind) = read_header(&mut reader)?;
                let def = object.property(index).ok_or(ReadError::UnknownProperty { index })?;
                segments.push(ReferenceSegment::Property(index));

                if kind == ReferenceKind::Special {
                    match (read_complete_reference_type(&mut reader)?, &def.kind) {
                        (CompleteReferenceType::MapKey, PropertyKind::Map { key, .. }) => {
                            segments.push(ReferenceSegment::MapKey(read_qualifier_bytes(&mut reader, *key)?));
                        }
                        (CompleteReferenceType::TypeOf, PropertyKind::MultiType(_)) => {
                            segments.push(ReferenceSegment::TypeOf);
                        }
                        _ => {
                            return Err(DecodeError::UnexpectedKind {
                                index,
                                expected: def.kind.kind_name(),
                                found: kind.name(),
                            }
                            .into());
                        }
                    }
                    Position::End
                } else {
                    expect_kind(index, kind, &def.kind)?;
                    Position::Inside(&def.kind)
                }
            }
            Position::Inside(kind) => match kind {
                PropertyKind::Embed(embedded) => Position::Object(embedded),
                PropertyKind::List(item) => {
                    segments.push(ReferenceSegment::ListItem(reader.read_u32_be("list index")?));
                    Position::Inside(item)
                }
                PropertyKind::Set(item_type) => {
                    segments.push(ReferenceSegment::SetItem(read_qualifier_bytes(&mut reader, *item_type)?));
                    Position::End
                }
                PropertyKind::Map { key, value } => {
                    segments.push(ReferenceSegment::MapValue(read_qualifier_bytes(&mut reader, *key)?));
                    Position::Inside(value)
                }
                PropertyKind::MultiType(_) => {
                    let (tag, header_kind) = read_header(&mut reader)?;
                    if header_kind != ReferenceKind::Type {
                        return Err(DecodeError::UnexpectedKind {
                            index: tag,
                            expected: ReferenceKind::Type.name(),
                            found: header_kind.name(),
                        }
                        .into());
                    }
                    let case = kind.type_case(tag).ok_or(DecodeError::UnknownTypeTag { tag })?;
                    segments.push(ReferenceSegment::TypeCase(tag));
                    Position::Inside(&case.kind)
                }
                PropertyKind::Value(_) => Position::End,
            },
            Position::End => {
                return Err(DecodeError::TrailingBytes {
                    context: "qualifier",
                    len: reader.remaining_len(),
                }
                .into());
            }
        };
    }

    Ok(PropertyReference::from_segments(segments))
}

/// Fails unless a header's kind is the one written for `definition`.
pub(crate) fn expect_kind(index: u32, found: ReferenceKind, definition: &PropertyKind) -> Result<(), DecodeError> {
    if found != definition.reference_kind() {
        return Err(DecodeError::UnexpectedKind {
            index,
            expected: definition.kind_name(),
            found: found.name(),
        });
    }
    Ok(())
}
