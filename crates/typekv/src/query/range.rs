//! Converts filters into key byte constraints and scan ranges.

use tracing::{debug, trace};

use crate::codec::primitives::Writer;
use crate::codec::qualifier::encode_reference;
use crate::codec::value::check_type;
use crate::error::EncodeError;
use crate::model::{PropertyDefinition, PropertyReference, Schema, Value};
use crate::query::filter::Filter;
use crate::query::key::KeyDefinition;
use crate::query::partial::{KeyPartials, PartialKind, PartialToMatch, UniqueToMatch};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
}

/// Collects the key part constraints and unique lookups implied by `filter`.
///
/// Comparison leaves on key parts become byte constraints, `And` recurses,
/// and every other filter kind is skipped without narrowing the scan.
pub fn build_scan_range_from_filter(
    schema: &Schema,
    key_definition: &KeyDefinition,
    filter: &Filter,
) -> Result<KeyPartials, EncodeError> {
    let mut out = KeyPartials::default();
    collect(schema, key_definition, filter, &mut out)?;
    debug!(
        schema = schema.name(),
        partials = out.partials.len(),
        uniques = out.uniques.len(),
        "built key partials from filter"
    );
    Ok(out)
}

fn collect(
    schema: &Schema,
    key_definition: &KeyDefinition,
    filter: &Filter,
    out: &mut KeyPartials,
) -> Result<(), EncodeError> {
    match filter {
        Filter::And(filters) => {
            for filter in filters {
                collect(schema, key_definition, filter, out)?;
            }
        }
        Filter::Equals(reference, value) => {
            add_unique(schema, reference, value, out)?;
            if let Some(part) = key_definition.part_for(reference) {
                let bytes = key_definition.parts()[part].value_bytes(value)?;
                out.partials.push(partial(key_definition, part, PartialKind::Exact(bytes)));
            }
        }
        Filter::ValueIn(reference, values) => {
            for value in values {
                add_unique(schema, reference, value, out)?;
            }
            if let Some(part) = key_definition.part_for(reference) {
                let key_part = &key_definition.parts()[part];
                let mut candidates = values
                    .iter()
                    .map(|v| key_part.value_bytes(v))
                    .collect::<Result<Vec<_>, _>>()?;
                candidates.sort();
                candidates.dedup();
                out.partials.push(partial(key_definition, part, PartialKind::OneOf(candidates)));
            }
        }
        Filter::GreaterThan(reference, value) => {
            add_bound(schema, key_definition, reference, value, Bound::Lower, false, out)?
        }
        Filter::GreaterThanEquals(reference, value) => {
            add_bound(schema, key_definition, reference, value, Bound::Lower, true, out)?
        }
        Filter::LessThan(reference, value) => {
            add_bound(schema, key_definition, reference, value, Bound::Upper, false, out)?
        }
        Filter::LessThanEquals(reference, value) => {
            add_bound(schema, key_definition, reference, value, Bound::Upper, true, out)?
        }
        Filter::Range {
            reference,
            from,
            from_inclusive,
            to,
            to_inclusive,
        } => {
            add_bound(schema, key_definition, reference, from, Bound::Lower, *from_inclusive, out)?;
            add_bound(schema, key_definition, reference, to, Bound::Upper, *to_inclusive, out)?;
        }
        Filter::Or(_) | Filter::Not(_) | Filter::Exists(_) | Filter::Prefix(..) | Filter::RegEx(..) => {
            trace!(filter = filter.name(), "filter does not narrow the key range");
        }
    }
    Ok(())
}

fn add_bound(
    schema: &Schema,
    key_definition: &KeyDefinition,
    reference: &PropertyReference,
    value: &Value,
    bound: Bound,
    inclusive: bool,
    out: &mut KeyPartials,
) -> Result<(), EncodeError> {
    resolve(schema, reference)?;
    let Some(part) = key_definition.part_for(reference) else {
        return Ok(());
    };
    let key_part = &key_definition.parts()[part];
    let bytes = key_part.value_bytes(value)?;

    // Inverted bytes sort the other way round.
    let lower = (bound == Bound::Lower) != key_part.reversed;
    let kind = if lower {
        PartialKind::GreaterThan { bytes, inclusive }
    } else {
        PartialKind::LessThan { bytes, inclusive }
    };
    out.partials.push(partial(key_definition, part, kind));
    Ok(())
}

fn add_unique(
    schema: &Schema,
    reference: &PropertyReference,
    value: &Value,
    out: &mut KeyPartials,
) -> Result<(), EncodeError> {
    let def = resolve(schema, reference)?;
    if !def.unique {
        return Ok(());
    }
    let Some(value_type) = def.kind.as_value_type() else {
        return Ok(());
    };
    check_type(value, value_type)?;
    out.uniques.push(UniqueToMatch {
        reference: encode_reference(schema, reference)?,
        value_type,
        value: value.clone(),
    });
    Ok(())
}

fn resolve<'s>(schema: &'s Schema, reference: &PropertyReference) -> Result<&'s PropertyDefinition, EncodeError> {
    schema.resolve(reference).ok_or(EncodeError::InvalidReference {
        context: "reference does not resolve to a property",
    })
}

fn partial(key_definition: &KeyDefinition, part: usize, kind: PartialKind) -> PartialToMatch {
    PartialToMatch {
        part_index: part,
        from_byte_index: key_definition.byte_offset(part),
        kind,
    }
}

/// Byte range of a key scan plus the constraints every key in it must meet.
///
/// Keys are visited in ascending order from [`start`](Self::start); a key for
/// which [`key_out_of_range`](Self::key_out_of_range) holds ends the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    pub start: Vec<u8>,
    /// Inclusive upper bound on the key's leading bytes, `None` for unbounded.
    pub end: Option<Vec<u8>>,
    key_definition: KeyDefinition,
    partials: Vec<PartialToMatch>,
}

impl ScanRange {
    /// Derives start and end from the leading exact parts and the first
    /// bounded part after them.
    pub fn new(key_definition: &KeyDefinition, partials: Vec<PartialToMatch>) -> Self {
        let mut prefix = Writer::new();
        let mut range = None;

        for part in 0..key_definition.parts().len() {
            let on_part = || partials.iter().filter(move |p| p.part_index == part).map(|p| &p.kind);
            let exact = on_part().find_map(|kind| match kind {
                PartialKind::Exact(bytes) => Some(bytes),
                _ => None,
            });

            if let Some(bytes) = exact {
                if key_definition.is_prefixed(part) {
                    prefix.write_bytes_prefixed(bytes);
                } else {
                    prefix.write_bytes(bytes);
                }
                continue;
            }
            if key_definition.is_prefixed(part) {
                break;
            }

            let mut lower: Option<&Vec<u8>> = None;
            let mut upper: Option<&Vec<u8>> = None;
            for kind in on_part() {
                let (lo, hi) = match kind {
                    PartialKind::GreaterThan { bytes, .. } => (Some(bytes), None),
                    PartialKind::LessThan { bytes, .. } => (None, Some(bytes)),
                    PartialKind::OneOf(candidates) => (candidates.first(), candidates.last()),
                    PartialKind::Exact(_) => (None, None),
                };
                lower = lower.max(lo);
                upper = match (upper, hi) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
            }

            let with_prefix = |bytes: &[u8]| {
                let mut full = prefix.as_bytes().to_vec();
                full.extend_from_slice(bytes);
                full
            };
            let start = lower.map(|b| with_prefix(b.as_slice())).unwrap_or_else(|| prefix.as_bytes().to_vec());
            let end = match upper {
                Some(b) => Some(with_prefix(b.as_slice())),
                None if prefix.is_empty() => None,
                None => Some(prefix.as_bytes().to_vec()),
            };
            range = Some((start, end));
            break;
        }

        let (start, end) = range.unwrap_or_else(|| {
            let prefix = prefix.into_bytes();
            let end = (!prefix.is_empty()).then(|| prefix.clone());
            (prefix, end)
        });

        Self {
            start,
            end,
            key_definition: key_definition.clone(),
            partials,
        }
    }

    /// True when the key sorts before the start of the range.
    pub fn key_before_start(&self, key: &[u8]) -> bool {
        key < self.start.as_slice()
    }

    /// True when the key, and every key after it, lies beyond the range.
    pub fn key_out_of_range(&self, key: &[u8]) -> bool {
        match &self.end {
            Some(end) => &key[..key.len().min(end.len())] > end.as_slice(),
            None => false,
        }
    }

    /// True when every partial matches the corresponding part of the key.
    pub fn matches_partials(&self, key: &[u8]) -> bool {
        let Ok(parts) = self.key_definition.split(key) else {
            return false;
        };
        self.partials
            .iter()
            .all(|p| parts.get(p.part_index).is_some_and(|part| p.matches(part)))
    }

    pub fn partials(&self) -> &[PartialToMatch] {
        &self.partials
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::codec::value::encode_storage_bytes;
    use crate::model::{ObjectValues, ValueType};
    use crate::query::key::KeyPart;

    fn schema() -> Schema {
        Schema::builder("Event")
            .value(1, "at", ValueType::DateTime)
            .value(2, "kind", ValueType::UInt32)
            .unique_value(3, "code", ValueType::Text)
            .value(4, "note", ValueType::Text)
            .build()
            .unwrap()
    }

    fn at(second: u32) -> Value {
        Value::date_time(2018, 12, 8, 12, 33, second)
    }

    #[test]
    fn test_exact_date_time_key() {
        let schema = schema();
        let key_definition = KeyDefinition::key(vec![KeyPart::new(1, ValueType::DateTime)]).unwrap();
        let filter = Filter::Equals(PropertyReference::property(1), at(23));

        let partials = build_scan_range_from_filter(&schema, &key_definition, &filter).unwrap();
        assert_eq!(
            partials.partials,
            vec![PartialToMatch {
                part_index: 0,
                from_byte_index: Some(0),
                kind: PartialKind::Exact(encode_storage_bytes(&at(23))),
            }]
        );
        assert!(partials.uniques.is_empty());

        let range = ScanRange::new(&key_definition, partials.partials);
        assert_eq!(range.start, encode_storage_bytes(&at(23)));

        let same = encode_storage_bytes(&at(23));
        assert!(!range.key_before_start(&same));
        assert!(!range.key_out_of_range(&same));
        assert!(range.matches_partials(&same));

        let later = encode_storage_bytes(&at(24));
        assert!(range.key_out_of_range(&later));
        assert!(!range.matches_partials(&later));
    }

    #[test]
    fn test_reversed_date_time_key() {
        let schema = schema();
        let key_definition = KeyDefinition::key(vec![KeyPart::reversed(1, ValueType::DateTime)]).unwrap();
        let equals = Filter::Equals(PropertyReference::property(1), at(23));

        let partials = build_scan_range_from_filter(&schema, &key_definition, &equals).unwrap();
        let range = ScanRange::new(&key_definition, partials.partials);

        let key = |v: Value| key_definition.encode(&ObjectValues::new().with(1, v)).unwrap();
        assert!(range.matches_partials(&key(at(23))));
        assert!(!range.key_before_start(&key(at(23))));
        // Later times have smaller inverted bytes and come first in the store.
        assert!(range.key_before_start(&key(at(24))));
        assert!(range.key_out_of_range(&key(at(22))));

        let after = Filter::GreaterThan(PropertyReference::property(1), at(23));
        let partials = build_scan_range_from_filter(&schema, &key_definition, &after).unwrap();
        assert!(matches!(partials.partials[0].kind, PartialKind::LessThan { inclusive: false, .. }));
        let range = ScanRange::new(&key_definition, partials.partials);
        assert!(range.start.is_empty());
        assert!(range.matches_partials(&key(at(24))));
        assert!(!range.matches_partials(&key(at(23))));
        assert!(range.key_out_of_range(&key(at(22))));
    }

    #[test]
    fn test_and_combines_parts() {
        let schema = schema();
        let key_definition = KeyDefinition::key(vec![
            KeyPart::new(2, ValueType::UInt32),
            KeyPart::new(1, ValueType::DateTime),
        ])
        .unwrap();
        let filter = Filter::And(vec![
            Filter::Equals(PropertyReference::property(2), Value::UInt32(5)),
            Filter::range(PropertyReference::property(1), at(10), at(20)),
            Filter::Exists(PropertyReference::property(4)),
        ]);

        let partials = build_scan_range_from_filter(&schema, &key_definition, &filter).unwrap();
        assert_eq!(partials.partials.len(), 3);
        assert!(partials.partials.iter().skip(1).all(|p| p.from_byte_index == Some(4)));

        let range = ScanRange::new(&key_definition, partials.partials);
        let key = |kind: u32, v: Value| {
            key_definition
                .encode(&ObjectValues::new().with(2, Value::UInt32(kind)).with(1, v))
                .unwrap()
        };
        assert_eq!(range.start, key(5, at(10)));
        assert_eq!(range.end, Some(key(5, at(20))));
        assert!(range.key_before_start(&key(5, at(9))));
        assert!(range.matches_partials(&key(5, at(15))));
        assert!(range.key_out_of_range(&key(5, at(21))));
        assert!(range.key_out_of_range(&key(6, at(0))));
    }

    #[test]
    fn test_value_in_sorted_one_of() {
        let schema = schema();
        let key_definition = KeyDefinition::key(vec![KeyPart::new(2, ValueType::UInt32)]).unwrap();
        let filter = Filter::ValueIn(
            PropertyReference::property(2),
            BTreeSet::from([Value::UInt32(9), Value::UInt32(3)]),
        );

        let partials = build_scan_range_from_filter(&schema, &key_definition, &filter).unwrap();
        assert_eq!(
            partials.partials[0].kind,
            PartialKind::OneOf(vec![vec![0, 0, 0, 3], vec![0, 0, 0, 9]])
        );
        let range = ScanRange::new(&key_definition, partials.partials);
        assert_eq!(range.start, vec![0, 0, 0, 3]);
        assert_eq!(range.end, Some(vec![0, 0, 0, 9]));
    }

    #[test]
    fn test_uniques_and_skipped_filters() {
        let schema = schema();
        let key_definition = KeyDefinition::key(vec![KeyPart::new(2, ValueType::UInt32)]).unwrap();
        let filter = Filter::And(vec![
            Filter::Equals(PropertyReference::property(3), Value::text("A-1")),
            Filter::ValueIn(
                PropertyReference::property(3),
                BTreeSet::from([Value::text("B-2"), Value::text("C-3")]),
            ),
            Filter::Or(vec![Filter::Equals(PropertyReference::property(2), Value::UInt32(1))]),
            Filter::Not(Box::new(Filter::Equals(PropertyReference::property(2), Value::UInt32(1)))),
        ]);

        let partials = build_scan_range_from_filter(&schema, &key_definition, &filter).unwrap();
        assert!(partials.partials.is_empty());
        assert_eq!(partials.uniques.len(), 3);
        assert!(partials.uniques.iter().all(|u| u.reference == vec![0x19] && u.value_type == ValueType::Text));

        let range = ScanRange::new(&key_definition, partials.partials);
        assert!(range.start.is_empty());
        assert_eq!(range.end, None);
    }

    #[test]
    fn test_errors() {
        let schema = schema();
        let key_definition = KeyDefinition::key(vec![KeyPart::new(2, ValueType::UInt32)]).unwrap();

        let wrong_type = Filter::Equals(PropertyReference::property(2), Value::text("x"));
        assert!(matches!(
            build_scan_range_from_filter(&schema, &key_definition, &wrong_type),
            Err(EncodeError::TypeMismatch { .. })
        ));

        let unknown = Filter::GreaterThan(PropertyReference::property(9), Value::UInt32(1));
        assert!(matches!(
            build_scan_range_from_filter(&schema, &key_definition, &unknown),
            Err(EncodeError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_index_with_text_prefix() {
        let schema = schema();
        let index = KeyDefinition::index(vec![
            KeyPart::new(4, ValueType::Text),
            KeyPart::new(2, ValueType::UInt32),
        ])
        .unwrap();
        let filter = Filter::And(vec![
            Filter::Equals(PropertyReference::property(4), Value::text("ab")),
            Filter::GreaterThanEquals(PropertyReference::property(2), Value::UInt32(2)),
        ]);

        let partials = build_scan_range_from_filter(&schema, &index, &filter).unwrap();
        assert_eq!(partials.partials[1].from_byte_index, None);

        let range = ScanRange::new(&index, partials.partials);
        assert_eq!(range.start, vec![2, b'a', b'b', 0, 0, 0, 2]);
        assert_eq!(range.end, Some(vec![2, b'a', b'b']));

        let key = |note: &str, kind: u32| {
            index
                .encode(&ObjectValues::new().with(4, Value::text(note)).with(2, Value::UInt32(kind)))
                .unwrap()
        };
        assert!(range.matches_partials(&key("ab", 3)));
        assert!(!range.matches_partials(&key("ab", 1)));
        assert!(range.key_out_of_range(&key("ac", 0)));
    }
}
