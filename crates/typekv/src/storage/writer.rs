//! Turns the typed values of an object into stored cells.
//!
//! This is the inverse of [`read_changes_from_qualifiers`](super::read_changes_from_qualifiers):
//! every cell written here resolves to a [`StorageCell`](super::StorageCell)
//! whose payload reads back to the same value.

use crate::codec::primitives::Writer;
use crate::codec::qualifier::{write_header, ReferenceKind};
use crate::codec::storage::{encode_size, encode_typed_value, EMBED_PRESENT, SET_ITEM_PRESENT};
use crate::codec::value::{check_type, encode_storage_bytes, write_qualifier_bytes};
use crate::error::EncodeError;
use crate::model::{ObjectValues, PropertyKind, PropertyValue, Schema, TypedValue, Value, ValueType};

type Sink<'a> = dyn FnMut(Vec<u8>, Vec<u8>) + 'a;

/// Writes every value of `values` as `(qualifier, payload)` cells to `sink`.
///
/// Collections get a size cell followed by one cell per item. Cells are
/// emitted property by property, not in qualifier byte order.
pub fn write_values_to_storage<F>(schema: &Schema, values: &ObjectValues, mut sink: F) -> Result<(), EncodeError>
where
    F: FnMut(Vec<u8>, Vec<u8>),
{
    write_object(schema, values, &[], &mut sink)
}

fn write_object(schema: &Schema, values: &ObjectValues, prefix: &[u8], sink: &mut Sink<'_>) -> Result<(), EncodeError> {
    for (index, value) in values.iter() {
        let def = schema.property(index).ok_or(EncodeError::UnknownProperty { index })?;
        let mut writer = Writer::with_capacity(prefix.len() + 5);
        writer.write_bytes(prefix);
        write_header(&mut writer, index, def.kind.reference_kind());
        write_property(&writer.into_bytes(), index, &def.kind, value, sink)?;
    }
    Ok(())
}

fn write_property(
    base: &[u8],
    index: u32,
    kind: &PropertyKind,
    value: &PropertyValue,
    sink: &mut Sink<'_>,
) -> Result<(), EncodeError> {
    match (kind, value) {
        (PropertyKind::Value(value_type), PropertyValue::Value(v)) => {
            check_type(v, *value_type)?;
            sink(base.to_vec(), value_payload(index, v)?);
        }
        (PropertyKind::List(item), PropertyValue::List(items)) => {
            let item_type = scalar_item(item, "complex list items")?;
            sink(base.to_vec(), encode_size(items.len() as u64));
            for (i, item) in items.iter().enumerate() {
                check_type(item, item_type)?;
                let i = u32::try_from(i).map_err(|_| EncodeError::ShapeMismatch {
                    index,
                    context: "list longer than u32::MAX",
                })?;
                let mut qualifier = Writer::with_capacity(base.len() + 4);
                qualifier.write_bytes(base);
                qualifier.write_u32_be(i);
                sink(qualifier.into_bytes(), value_payload(index, item)?);
            }
        }
        (PropertyKind::Set(item_type), PropertyValue::Set(items)) => {
            sink(base.to_vec(), encode_size(items.len() as u64));
            for item in items {
                check_type(item, *item_type)?;
                let mut qualifier = Writer::new();
                qualifier.write_bytes(base);
                write_qualifier_bytes(&mut qualifier, item);
                sink(qualifier.into_bytes(), vec![SET_ITEM_PRESENT]);
            }
        }
        (PropertyKind::Map { key, value }, PropertyValue::Map(entries)) => {
            let value_type = scalar_item(value, "complex map values")?;
            sink(base.to_vec(), encode_size(entries.len() as u64));
            for (k, v) in entries {
                check_type(k, *key)?;
                check_type(v, value_type)?;
                let mut qualifier = Writer::new();
                qualifier.write_bytes(base);
                write_qualifier_bytes(&mut qualifier, k);
                sink(qualifier.into_bytes(), value_payload(index, v)?);
            }
        }
        (PropertyKind::MultiType(_), PropertyValue::Typed { tag, value }) => {
            let case = kind.type_case(*tag).ok_or(EncodeError::ShapeMismatch {
                index,
                context: "unknown type tag",
            })?;
            match (&case.kind, value.as_ref()) {
                (PropertyKind::Value(value_type), PropertyValue::Value(v)) => {
                    check_type(v, *value_type)?;
                    sink(base.to_vec(), encode_typed_value(&TypedValue::new(*tag, v.clone())));
                }
                (PropertyKind::Value(_), _) => {
                    return Err(EncodeError::ShapeMismatch {
                        index,
                        context: "simple type case needs a scalar value",
                    });
                }
                (case_kind, inner) => {
                    sink(base.to_vec(), encode_typed_value(&TypedValue::complex(*tag)));
                    let mut nested = Writer::with_capacity(base.len() + 2);
                    nested.write_bytes(base);
                    write_header(&mut nested, *tag, ReferenceKind::Type);
                    write_property(nested.as_bytes(), index, case_kind, inner, sink)?;
                }
            }
        }
        (PropertyKind::Embed(embedded), PropertyValue::Embed(object)) => {
            sink(base.to_vec(), vec![EMBED_PRESENT]);
            write_object(embedded, object, base, sink)?;
        }
        _ => {
            return Err(EncodeError::ShapeMismatch {
                index,
                context: "value does not match property kind",
            });
        }
    }
    Ok(())
}

/// Storage bytes of a scalar stored directly as a payload.
///
/// An empty payload marks a deletion, so empty text and bytes cannot be stored there.
fn value_payload(index: u32, value: &Value) -> Result<Vec<u8>, EncodeError> {
    let payload = encode_storage_bytes(value);
    if payload.is_empty() {
        return Err(EncodeError::EmptyPayload { index });
    }
    Ok(payload)
}

fn scalar_item(kind: &PropertyKind, context: &'static str) -> Result<ValueType, EncodeError> {
    kind.as_value_type()
        .ok_or(EncodeError::UnsupportedStructure { context })
}
