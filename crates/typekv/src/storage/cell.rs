//! Classification of stored qualifiers into storage cells.
//!
//! Every qualifier of an object resolves to exactly one [`StorageCell`]; the
//! cell decides how the payloads of its records are read.

use crate::changes::{ChangePart, ReferenceValuePair};
use crate::codec::primitives::Reader;
use crate::codec::qualifier::{
    expect_kind, is_soft_delete_qualifier, read_complete_reference_type, read_header, CompleteReferenceType,
    ReferenceKind,
};
use crate::codec::storage::{decode_size, decode_typed_value, embed_is_present, SET_ITEM_PRESENT};
use crate::codec::value::{decode_storage_bytes, read_qualifier_bytes};
use crate::error::{DecodeError, ReadError};
use crate::limits::MAX_QUALIFIER_LEN;
use crate::model::{PropertyKind, PropertyReference, ReferenceSegment, Schema, Selection, TypeCase, Value, ValueType};

/// What a qualifier addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageCell<'s> {
    /// The object soft delete flag.
    ObjectDelete,
    /// A scalar property.
    Value {
        reference: PropertyReference,
        value_type: ValueType,
    },
    /// A multi-type property; the payload carries the type tag.
    MultiType {
        reference: PropertyReference,
        cases: &'s [TypeCase],
    },
    /// Presence marker of an embedded object.
    Embed { reference: PropertyReference },
    /// Cardinality of a list, set or map.
    CollectionSize { reference: PropertyReference },
    ListItem {
        reference: PropertyReference,
        index: u32,
        item_type: ValueType,
    },
    SetItem {
        reference: PropertyReference,
        value: Value,
    },
    MapItem {
        reference: PropertyReference,
        key: Value,
        value_type: ValueType,
    },
}

/// Resolves a qualifier to its cell, or `None` when the property is not selected.
pub fn resolve_cell<'s>(
    schema: &'s Schema,
    qualifier: &[u8],
    selection: Option<&Selection>,
) -> Result<Option<StorageCell<'s>>, ReadError> {
    if qualifier.len() > MAX_QUALIFIER_LEN {
        return Err(DecodeError::LengthExceedsLimit {
            field: "qualifier",
            len: qualifier.len(),
            max: MAX_QUALIFIER_LEN,
        }
        .into());
    }
    if is_soft_delete_qualifier(qualifier) {
        return Ok(Some(StorageCell::ObjectDelete));
    }

    let mut reader = Reader::new(qualifier);
    let mut segments = Vec::new();
    let mut object = schema;
    let mut selection = selection;

    loop {
        let (index, kind) = read_header(&mut reader)?;
        let def = object.property(index).ok_or(ReadError::UnknownProperty { index })?;

        let sub_selection = match selection {
            Some(selected) => match selected.select_node_or_null(index) {
                Some(node) => node.sub_selection(),
                None => return Ok(None),
            },
            None => None,
        };

        if kind == ReferenceKind::Special {
            return match read_complete_reference_type(&mut reader)? {
                CompleteReferenceType::ObjectDelete => Err(DecodeError::MalformedEncoding {
                    context: "object delete marker inside a property",
                }
                .into()),
                CompleteReferenceType::MapKey | CompleteReferenceType::TypeOf => Err(ReadError::UnsupportedStructure {
                    context: "reference-only qualifier in stored data",
                }),
            };
        }
        expect_kind(index, kind, &def.kind)?;
        segments.push(ReferenceSegment::Property(index));

        match resolve_inside(&mut reader, &mut segments, &def.kind)? {
            Inner::Cell(cell) => {
                if !reader.is_empty() {
                    return Err(DecodeError::TrailingBytes {
                        context: "qualifier",
                        len: reader.remaining_len(),
                    }
                    .into());
                }
                return Ok(Some(cell));
            }
            Inner::Embedded(embedded) => {
                object = embedded;
                selection = sub_selection;
            }
        }
    }
}

enum Inner<'s> {
    Cell(StorageCell<'s>),
    /// The qualifier continues with a property of this embedded schema.
    Embedded(&'s Schema),
}

/// Resolves the rest of a qualifier inside a property of `kind`.
fn resolve_inside<'s>(
    reader: &mut Reader<'_>,
    segments: &mut Vec<ReferenceSegment>,
    kind: &'s PropertyKind,
) -> Result<Inner<'s>, ReadError> {
    let at_end = reader.is_empty();
    let cell = match kind {
        PropertyKind::Value(value_type) => StorageCell::Value {
            reference: reference(segments),
            value_type: *value_type,
        },
        PropertyKind::MultiType(cases) => {
            if at_end {
                StorageCell::MultiType {
                    reference: reference(segments),
                    cases,
                }
            } else {
                let (tag, header_kind) = read_header(reader)?;
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
                return resolve_inside(reader, segments, &case.kind);
            }
        }
        PropertyKind::Embed(embedded) => {
            if at_end {
                StorageCell::Embed {
                    reference: reference(segments),
                }
            } else {
                return Ok(Inner::Embedded(embedded));
            }
        }
        PropertyKind::List(_) | PropertyKind::Set(_) | PropertyKind::Map { .. } if at_end => {
            StorageCell::CollectionSize {
                reference: reference(segments),
            }
        }
        PropertyKind::List(item) => {
            let index = reader.read_u32_be("list index")?;
            match item.as_ref() {
                PropertyKind::Value(item_type) => StorageCell::ListItem {
                    reference: reference(segments),
                    index,
                    item_type: *item_type,
                },
                _ => {
                    return Err(ReadError::UnsupportedStructure {
                        context: "complex list items",
                    });
                }
            }
        }
        PropertyKind::Set(item_type) => StorageCell::SetItem {
            reference: reference(segments),
            value: read_qualifier_bytes(reader, *item_type)?,
        },
        PropertyKind::Map { key, value } => {
            let key = read_qualifier_bytes(reader, *key)?;
            match value.as_ref() {
                PropertyKind::Value(value_type) => StorageCell::MapItem {
                    reference: reference(segments),
                    key,
                    value_type: *value_type,
                },
                _ => {
                    return Err(ReadError::UnsupportedStructure {
                        context: "complex map values",
                    });
                }
            }
        }
    };
    Ok(Inner::Cell(cell))
}

fn reference(segments: &[ReferenceSegment]) -> PropertyReference {
    PropertyReference::from_segments(segments.to_vec())
}

impl StorageCell<'_> {
    /// Reads one record payload of this cell. An empty payload is the
    /// cell's removal; informational payloads produce no part.
    pub fn read_payload(&self, payload: &[u8]) -> Result<Option<ChangePart>, ReadError> {
        let part = match self {
            StorageCell::ObjectDelete => {
                let is_deleted = match payload {
                    [] | [0x00] => false,
                    [0x01] => true,
                    [byte, ..] => return Err(DecodeError::InvalidBool { value: *byte }.into()),
                };
                Some(ChangePart::ObjectSoftDelete { is_deleted })
            }
            StorageCell::Value { reference, value_type } => Some(if payload.is_empty() {
                ChangePart::Delete(reference.clone())
            } else {
                ChangePart::Scalar(ReferenceValuePair::new(
                    reference.clone(),
                    decode_storage_bytes(*value_type, payload)?,
                ))
            }),
            StorageCell::MultiType { reference, cases } => Some(if payload.is_empty() {
                ChangePart::Delete(reference.clone())
            } else {
                let typed = decode_typed_value(payload, |tag| {
                    let case = cases
                        .iter()
                        .find(|c| c.tag == tag)
                        .ok_or(DecodeError::UnknownTypeTag { tag })?;
                    case.kind.as_value_type().ok_or(DecodeError::MalformedEncoding {
                        context: "inline value for a complex type",
                    })
                })?;
                ChangePart::Scalar(ReferenceValuePair::new(reference.clone(), typed))
            }),
            StorageCell::Embed { reference } => {
                if embed_is_present(payload)? {
                    None
                } else {
                    Some(ChangePart::Delete(reference.clone()))
                }
            }
            StorageCell::CollectionSize { reference } => {
                if payload.is_empty() {
                    Some(ChangePart::Delete(reference.clone()))
                } else {
                    decode_size(payload)?;
                    None
                }
            }
            StorageCell::ListItem {
                reference,
                index,
                item_type,
            } => Some(if payload.is_empty() {
                ChangePart::ListDelete {
                    reference: reference.clone(),
                    index: *index,
                }
            } else {
                ChangePart::ListAdd {
                    reference: reference.clone(),
                    index: *index,
                    value: decode_storage_bytes(*item_type, payload)?,
                }
            }),
            StorageCell::SetItem { reference, value } => Some(match payload {
                [] => ChangePart::SetDelete {
                    reference: reference.clone(),
                    value: value.clone(),
                },
                [SET_ITEM_PRESENT] => ChangePart::SetAdd {
                    reference: reference.clone(),
                    value: value.clone(),
                },
                _ => {
                    return Err(DecodeError::MalformedEncoding {
                        context: "set item payload",
                    }
                    .into());
                }
            }),
            StorageCell::MapItem {
                reference,
                key,
                value_type,
            } => Some(if payload.is_empty() {
                ChangePart::MapDelete {
                    reference: reference.clone(),
                    key: key.clone(),
                }
            } else {
                ChangePart::MapAdd {
                    reference: reference.clone(),
                    key: key.clone(),
                    value: decode_storage_bytes(*value_type, payload)?,
                }
            }),
        };
        Ok(part)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::encode_reference;
    use crate::model::TypedValue;

    fn schema() -> Schema {
        let address = Schema::builder("Address")
            .value(1, "street", ValueType::Text)
            .value(2, "number", ValueType::UInt32)
            .build()
            .unwrap();
        Schema::builder("Person")
            .value(1, "name", ValueType::Text)
            .list(2, "nicknames", ValueType::Text)
            .set(3, "dates", ValueType::Date)
            .map(4, "scores", ValueType::Text, ValueType::Int32)
            .multi_type(
                5,
                "contact",
                vec![
                    TypeCase::new(1, "email", PropertyKind::Value(ValueType::Text)),
                    TypeCase::new(2, "address", PropertyKind::Embed(Arc::new(address.clone()))),
                ],
            )
            .embed(6, "home", Arc::new(address))
            .property(7, "matrix", PropertyKind::List(Box::new(PropertyKind::List(Box::new(PropertyKind::Value(ValueType::Int32))))))
            .build()
            .unwrap()
    }

    fn cell(schema: &Schema, reference: PropertyReference) -> StorageCell<'_> {
        let qualifier = encode_reference(schema, &reference).unwrap();
        resolve_cell(schema, &qualifier, None).unwrap().unwrap()
    }

    #[test]
    fn test_resolves_every_cell_kind() {
        let schema = schema();
        assert!(matches!(cell(&schema, PropertyReference::property(1)), StorageCell::Value { value_type: ValueType::Text, .. }));
        assert!(matches!(cell(&schema, PropertyReference::property(2)), StorageCell::CollectionSize { .. }));
        assert!(matches!(
            cell(&schema, PropertyReference::property(2).list_item(4)),
            StorageCell::ListItem { index: 4, .. }
        ));
        assert!(matches!(
            cell(&schema, PropertyReference::property(3).set_item(Value::date(1981, 12, 5))),
            StorageCell::SetItem { .. }
        ));
        assert!(matches!(
            cell(&schema, PropertyReference::property(4).map_value(Value::text("a"))),
            StorageCell::MapItem { value_type: ValueType::Int32, .. }
        ));
        assert!(matches!(cell(&schema, PropertyReference::property(5)), StorageCell::MultiType { .. }));
        assert!(matches!(cell(&schema, PropertyReference::property(6)), StorageCell::Embed { .. }));
        assert_eq!(resolve_cell(&schema, &[0x00, 0x00], None).unwrap(), Some(StorageCell::ObjectDelete));
    }

    #[test]
    fn test_nested_references() {
        let schema = schema();
        let street = PropertyReference::property(6).child(1);
        assert_eq!(
            cell(&schema, street.clone()),
            StorageCell::Value {
                reference: street,
                value_type: ValueType::Text
            }
        );

        let typed_street = PropertyReference::property(5).type_case(2).child(2);
        assert_eq!(
            cell(&schema, typed_street.clone()),
            StorageCell::Value {
                reference: typed_street,
                value_type: ValueType::UInt32
            }
        );
    }

    #[test]
    fn test_selection_skips() {
        let schema = schema();
        let selection = Selection::new().select(1).select_nested(6, Selection::new().select(2));
        let name = encode_reference(&schema, &PropertyReference::property(1)).unwrap();
        let nicknames = encode_reference(&schema, &PropertyReference::property(2)).unwrap();
        let street = encode_reference(&schema, &PropertyReference::property(6).child(1)).unwrap();
        let number = encode_reference(&schema, &PropertyReference::property(6).child(2)).unwrap();

        assert!(resolve_cell(&schema, &name, Some(&selection)).unwrap().is_some());
        assert!(resolve_cell(&schema, &nicknames, Some(&selection)).unwrap().is_none());
        assert!(resolve_cell(&schema, &street, Some(&selection)).unwrap().is_none());
        assert!(resolve_cell(&schema, &number, Some(&selection)).unwrap().is_some());
    }

    #[test]
    fn test_unsupported_structures() {
        let schema = schema();
        let nested_list = encode_reference(&schema, &PropertyReference::property(7).list_item(0).list_item(1)).unwrap();
        assert!(matches!(
            resolve_cell(&schema, &nested_list, None),
            Err(ReadError::UnsupportedStructure { .. })
        ));

        let type_of = encode_reference(&schema, &PropertyReference::property(5).type_of()).unwrap();
        assert!(matches!(
            resolve_cell(&schema, &type_of, None),
            Err(ReadError::UnsupportedStructure { .. })
        ));

        assert_eq!(
            resolve_cell(&schema, &[0x41], None),
            Err(ReadError::UnknownProperty { index: 8 })
        );
    }

    #[test]
    fn test_null_payload_is_removal() {
        let schema = schema();
        let list_item = cell(&schema, PropertyReference::property(2).list_item(3));
        assert_eq!(
            list_item.read_payload(&[]).unwrap(),
            Some(ChangePart::ListDelete {
                reference: PropertyReference::property(2),
                index: 3
            })
        );

        let size = cell(&schema, PropertyReference::property(3));
        assert_eq!(size.read_payload(&[2]).unwrap(), None);
        assert_eq!(
            size.read_payload(&[]).unwrap(),
            Some(ChangePart::Delete(PropertyReference::property(3)))
        );

        let embed = cell(&schema, PropertyReference::property(6));
        assert_eq!(embed.read_payload(&[0x01]).unwrap(), None);
        assert_eq!(
            embed.read_payload(&[]).unwrap(),
            Some(ChangePart::Delete(PropertyReference::property(6)))
        );
    }

    #[test]
    fn test_multi_type_payload() {
        let schema = schema();
        let contact = cell(&schema, PropertyReference::property(5));
        assert_eq!(
            contact.read_payload(&[0x02, b'x']).unwrap(),
            Some(ChangePart::Scalar(ReferenceValuePair::new(
                PropertyReference::property(5),
                TypedValue::new(1, Value::text("x"))
            )))
        );
        assert_eq!(
            contact.read_payload(&[0x05]).unwrap(),
            Some(ChangePart::Scalar(ReferenceValuePair::new(
                PropertyReference::property(5),
                TypedValue::complex(2)
            )))
        );
        assert!(contact.read_payload(&[0x06]).is_err());
    }
}
