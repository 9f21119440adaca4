//! An ordered in-memory store of versioned cells per object key.
//!
//! Objects are kept in key order and their cells in qualifier order, the
//! layout a sorted key-value store gives. Records of a cell are kept newest
//! first.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::changes::VersionedChanges;
use crate::codec::qualifier::{encode_header, encode_reference, ReferenceKind, SOFT_DELETE_QUALIFIER};
use crate::codec::storage::{encode_record, Version};
use crate::codec::value::encode_storage_bytes;
use crate::error::{EncodeError, ReadError, StoreError};
use crate::model::{ObjectValues, PropertyReference, PropertyValue, ReferenceSegment, Schema, Selection, Value};
use crate::query::{build_scan_range_from_filter, Filter, KeyDefinition, KeyPartials, ScanRange};
use crate::storage::stream::{QualifierStream, RecordConsumer};
use crate::storage::walker::read_changes_from_qualifiers;
use crate::storage::writer::write_values_to_storage;

/// Records of one cell, newest version first.
type Records = Vec<(Version, Vec<u8>)>;

/// Cells of one object by qualifier.
type Cells = BTreeMap<Vec<u8>, Records>;

/// Multi-version storage of the objects of one schema.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    schema: Arc<Schema>,
    objects: BTreeMap<Vec<u8>, Cells>,
    /// `(qualifier, value bytes)` of unique properties to object key.
    uniques: FxHashMap<(Vec<u8>, Vec<u8>), Vec<u8>>,
    /// `(object key, qualifier)` to the value bytes currently indexed in `uniques`.
    unique_values: FxHashMap<(Vec<u8>, Vec<u8>), Vec<u8>>,
}

impl MemoryStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            objects: BTreeMap::new(),
            uniques: FxHashMap::default(),
            unique_values: FxHashMap::default(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Stores the values of an object at `version`.
    pub fn put(&mut self, key: &[u8], version: Version, values: &ObjectValues) -> Result<(), EncodeError> {
        let mut written = Vec::new();
        write_values_to_storage(&self.schema, values, |qualifier, payload| written.push((qualifier, payload)))?;

        for (index, value) in values.iter() {
            let unique = self.schema.property(index).is_some_and(|def| def.unique);
            if let (true, PropertyValue::Value(value)) = (unique, value) {
                let qualifier = encode_header(index, ReferenceKind::Value);
                self.index_unique(key, qualifier, Some(encode_storage_bytes(value)));
            }
        }

        let cells = self.objects.entry(key.to_vec()).or_default();
        for (qualifier, payload) in written {
            insert_record(cells, qualifier, version, payload);
        }
        Ok(())
    }

    /// Records a deletion of the cell `reference` addresses at `version`.
    pub fn delete(&mut self, key: &[u8], version: Version, reference: &PropertyReference) -> Result<(), EncodeError> {
        if matches!(
            reference.last(),
            Some(ReferenceSegment::MapKey(_) | ReferenceSegment::TypeOf)
        ) {
            return Err(EncodeError::InvalidReference {
                context: "reference does not address a stored cell",
            });
        }
        let qualifier = encode_reference(&self.schema, reference)?;
        if let [ReferenceSegment::Property(index)] = reference.segments() {
            if self.schema.property(*index).is_some_and(|def| def.unique) {
                self.index_unique(key, qualifier.clone(), None);
            }
        }
        let cells = self.objects.entry(key.to_vec()).or_default();
        insert_record(cells, qualifier, version, Vec::new());
        Ok(())
    }

    /// Points the unique entry of `qualifier` for `key` at `value`, dropping
    /// the entry of its previous value.
    fn index_unique(&mut self, key: &[u8], qualifier: Vec<u8>, value: Option<Vec<u8>>) {
        let slot = (key.to_vec(), qualifier);
        if let Some(previous) = self.unique_values.remove(&slot) {
            let entry = (slot.1.clone(), previous);
            if self.uniques.get(&entry).is_some_and(|owner| owner.as_slice() == key) {
                self.uniques.remove(&entry);
            }
        }
        if let Some(value) = value {
            self.uniques.insert((slot.1.clone(), value.clone()), slot.0.clone());
            self.unique_values.insert(slot, value);
        }
    }

    /// Sets or clears the soft delete flag of an object.
    pub fn soft_delete(&mut self, key: &[u8], version: Version, is_deleted: bool) {
        let cells = self.objects.entry(key.to_vec()).or_default();
        insert_record(cells, SOFT_DELETE_QUALIFIER.to_vec(), version, vec![u8::from(is_deleted)]);
    }

    /// Returns the key of the object holding `value` in a unique property.
    pub fn unique_key(&self, qualifier: &[u8], value: &Value) -> Option<&[u8]> {
        self.uniques
            .get(&(qualifier.to_vec(), encode_storage_bytes(value)))
            .map(Vec::as_slice)
    }

    /// Reads the changes of one object at or after `from_version`.
    pub fn changes(
        &self,
        key: &[u8],
        from_version: Version,
        selection: Option<&Selection>,
    ) -> Result<Vec<VersionedChanges>, ReadError> {
        let Some(cells) = self.objects.get(key) else {
            return Ok(Vec::new());
        };
        let mut cursor = ObjectCursor::new(cells, from_version);
        read_changes_from_qualifiers(&self.schema, &mut cursor, selection)
    }

    /// Reads the changes of every object whose key the filter admits.
    ///
    /// The filter only narrows the candidates by key bytes and unique
    /// lookups; evaluating it against values is up to the caller.
    pub fn scan_changes(
        &self,
        key_definition: &KeyDefinition,
        filter: &Filter,
        from_version: Version,
        selection: Option<&Selection>,
    ) -> Result<Vec<(Vec<u8>, Vec<VersionedChanges>)>, StoreError> {
        let KeyPartials { partials, uniques } = build_scan_range_from_filter(&self.schema, key_definition, filter)?;
        let range = ScanRange::new(key_definition, partials);

        let keys: Vec<&[u8]> = if uniques.is_empty() {
            self.objects
                .range(range.start.clone()..)
                .map(|(key, _)| key.as_slice())
                .take_while(|key| !range.key_out_of_range(key))
                .filter(|key| range.matches_partials(key))
                .collect()
        } else {
            let mut keys: Vec<&[u8]> = uniques
                .iter()
                .filter_map(|u| self.unique_key(&u.reference, &u.value))
                .filter(|key| !range.key_before_start(key) && !range.key_out_of_range(key))
                .filter(|key| range.matches_partials(key))
                .collect();
            keys.sort_unstable();
            keys.dedup();
            keys
        };

        debug!(
            schema = self.schema.name(),
            start = %hex::encode(&range.start),
            uniques = uniques.len(),
            matched = keys.len(),
            "scanned keys"
        );

        keys.into_iter()
            .map(|key| Ok((key.to_vec(), self.changes(key, from_version, selection)?)))
            .collect()
    }
}

fn insert_record(cells: &mut Cells, qualifier: Vec<u8>, version: Version, payload: Vec<u8>) {
    let records = cells.entry(qualifier).or_default();
    match records.binary_search_by(|(v, _)| version.cmp(v)) {
        Ok(pos) => records[pos].1 = payload,
        Err(pos) => records.insert(pos, (version, payload)),
    }
}

/// Walks the cells of one object as a [`QualifierStream`].
struct ObjectCursor<'a> {
    cells: btree_map::Iter<'a, Vec<u8>, Records>,
    current: Option<&'a Records>,
    from_version: Version,
}

impl<'a> ObjectCursor<'a> {
    fn new(cells: &'a Cells, from_version: Version) -> Self {
        Self {
            cells: cells.iter(),
            current: None,
            from_version,
        }
    }
}

impl QualifierStream for ObjectCursor<'_> {
    fn next_qualifier(&mut self) -> Option<Vec<u8>> {
        let (qualifier, records) = self.cells.next()?;
        self.current = Some(records);
        Some(qualifier.clone())
    }

    fn read_records(&mut self, consumer: &mut RecordConsumer<'_>) -> Result<(), ReadError> {
        let Some(records) = self.current.take() else {
            return Ok(());
        };
        for (version, payload) in records.iter().take_while(|(v, _)| *v >= self.from_version) {
            consumer(&encode_record(*version, payload))?;
        }
        Ok(())
    }
}
