//! Collects change parts into version-sorted [`VersionedChanges`].

use crate::changes::change::{
    Change, ChangeKind, ChangePart, ListChange, MapChange, ReferenceValuePair, SetChange, VersionedChanges,
};
use crate::codec::storage::Version;
use crate::model::PropertyReference;

/// Accumulates change parts in ascending version order.
///
/// Parts may arrive in any version order; each version appears exactly once
/// in the result and parts of the same kind (and reference, for collections)
/// are merged into one entry.
#[derive(Debug, Default)]
pub struct ChangeAggregator {
    entries: Vec<PendingVersion>,
}

impl ChangeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one part recorded at `version`.
    pub fn add(&mut self, version: Version, part: ChangePart) {
        let pos = match self.entries.binary_search_by_key(&version, |e| e.version) {
            Ok(pos) => pos,
            Err(pos) => {
                self.entries.insert(pos, PendingVersion::new(version));
                pos
            }
        };
        self.entries[pos].merge(part);
    }

    /// Number of distinct versions collected so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the collected changes, ascending by version.
    pub fn finish(self) -> Vec<VersionedChanges> {
        self.entries.into_iter().map(PendingVersion::finish).collect()
    }
}

/// Parts of one version, bucketed by kind.
#[derive(Debug)]
struct PendingVersion {
    version: Version,
    /// Kinds in the order their first part arrived.
    order: Vec<ChangeKind>,
    scalars: Vec<ReferenceValuePair>,
    deletes: Vec<PropertyReference>,
    lists: Vec<ListChange>,
    sets: Vec<SetChange>,
    maps: Vec<MapChange>,
    soft_deleted: bool,
}

impl PendingVersion {
    fn new(version: Version) -> Self {
        Self {
            version,
            order: Vec::new(),
            scalars: Vec::new(),
            deletes: Vec::new(),
            lists: Vec::new(),
            sets: Vec::new(),
            maps: Vec::new(),
            soft_deleted: false,
        }
    }

    fn merge(&mut self, part: ChangePart) {
        let kind = part.kind();
        if !self.order.contains(&kind) {
            self.order.push(kind);
        }

        match part {
            ChangePart::Scalar(pair) => upsert_pair(&mut self.scalars, pair),
            ChangePart::Delete(reference) => {
                if !self.deletes.contains(&reference) {
                    self.deletes.push(reference);
                }
            }
            ChangePart::ListAdd { reference, index, value } => {
                entry(&mut self.lists, reference, |c| &c.reference, ListChange::new)
                    .add_values_at_index
                    .insert(index, value);
            }
            ChangePart::ListDelete { reference, index } => {
                entry(&mut self.lists, reference, |c| &c.reference, ListChange::new)
                    .delete_at_index
                    .insert(index);
            }
            ChangePart::SetAdd { reference, value } => {
                entry(&mut self.sets, reference, |c| &c.reference, SetChange::new)
                    .add_values
                    .insert(value);
            }
            ChangePart::SetDelete { reference, value } => {
                entry(&mut self.sets, reference, |c| &c.reference, SetChange::new)
                    .delete_values
                    .insert(value);
            }
            ChangePart::MapAdd { reference, key, value } => {
                entry(&mut self.maps, reference, |c| &c.reference, MapChange::new)
                    .values_to_add
                    .insert(key, value);
            }
            ChangePart::MapDelete { reference, key } => {
                entry(&mut self.maps, reference, |c| &c.reference, MapChange::new)
                    .keys_to_delete
                    .insert(key);
            }
            ChangePart::ObjectSoftDelete { is_deleted } => self.soft_deleted = is_deleted,
        }
    }

    fn finish(self) -> VersionedChanges {
        let Self {
            version,
            order,
            mut scalars,
            mut deletes,
            mut lists,
            mut sets,
            mut maps,
            soft_deleted,
        } = self;

        // Each kind occurs once in `order`, so every bucket is taken once.
        let changes = order
            .into_iter()
            .map(|kind| match kind {
                ChangeKind::Scalar => Change::Scalar(std::mem::take(&mut scalars)),
                ChangeKind::Delete => Change::Delete(std::mem::take(&mut deletes)),
                ChangeKind::List => Change::List(std::mem::take(&mut lists)),
                ChangeKind::Set => Change::Set(std::mem::take(&mut sets)),
                ChangeKind::Map => Change::Map(std::mem::take(&mut maps)),
                ChangeKind::ObjectSoftDelete => Change::ObjectSoftDelete {
                    is_deleted: soft_deleted,
                },
            })
            .collect();
        VersionedChanges::new(version, changes)
    }
}

/// A later value for the same reference at the same version replaces the earlier one.
fn upsert_pair(pairs: &mut Vec<ReferenceValuePair>, pair: ReferenceValuePair) {
    match pairs.iter_mut().find(|p| p.reference == pair.reference) {
        Some(existing) => existing.value = pair.value,
        None => pairs.push(pair),
    }
}

fn entry<T>(
    items: &mut Vec<T>,
    reference: PropertyReference,
    key: impl Fn(&T) -> &PropertyReference,
    create: impl FnOnce(PropertyReference) -> T,
) -> &mut T {
    let pos = match items.iter().position(|item| key(item) == &reference) {
        Some(pos) => pos,
        None => {
            items.push(create(reference));
            items.len() - 1
        }
    };
    &mut items[pos]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use proptest::prelude::*;

    fn list_ref() -> PropertyReference {
        PropertyReference::property(3)
    }

    #[test]
    fn test_versions_sorted_and_unique() {
        let mut agg = ChangeAggregator::new();
        agg.add(5, ChangePart::Delete(PropertyReference::property(1)));
        agg.add(2, ChangePart::Delete(PropertyReference::property(2)));
        agg.add(5, ChangePart::Delete(PropertyReference::property(3)));
        agg.add(3, ChangePart::ObjectSoftDelete { is_deleted: true });

        let result = agg.finish();
        let versions: Vec<_> = result.iter().map(|v| v.version).collect();
        assert_eq!(versions, vec![2, 3, 5]);
        assert_eq!(
            result[2].changes,
            vec![Change::Delete(vec![
                PropertyReference::property(1),
                PropertyReference::property(3)
            ])]
        );
    }

    #[test]
    fn test_list_parts_merge_per_reference() {
        let mut agg = ChangeAggregator::new();
        agg.add(1233, ChangePart::ListAdd { reference: list_ref(), index: 0, value: Value::text("v1") });
        agg.add(1234, ChangePart::ListAdd { reference: list_ref(), index: 1, value: Value::text("v2") });
        agg.add(1234, ChangePart::ListAdd { reference: list_ref(), index: 2, value: Value::text("v3") });
        agg.add(1234, ChangePart::ListDelete { reference: list_ref(), index: 3 });
        agg.add(1234, ChangePart::ListDelete { reference: list_ref(), index: 4 });

        let result = agg.finish();
        assert_eq!(result.len(), 2);

        let Some(Change::List(lists)) = result[1].change(ChangeKind::List) else {
            panic!("expected list change");
        };
        assert_eq!(lists.len(), 1);
        assert_eq!(
            lists[0].add_values_at_index.keys().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(lists[0].delete_at_index.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_one_change_per_kind() {
        let mut agg = ChangeAggregator::new();
        agg.add(1, ChangePart::Scalar(ReferenceValuePair::new(PropertyReference::property(1), Value::Int32(1))));
        agg.add(1, ChangePart::SetAdd { reference: PropertyReference::property(4), value: Value::Int32(1) });
        agg.add(1, ChangePart::Scalar(ReferenceValuePair::new(PropertyReference::property(2), Value::Int32(2))));
        agg.add(1, ChangePart::SetDelete { reference: PropertyReference::property(5), value: Value::Int32(9) });

        let result = agg.finish();
        assert_eq!(result.len(), 1);
        let kinds: Vec<_> = result[0].changes.iter().map(Change::kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Scalar, ChangeKind::Set]);

        let Some(Change::Set(sets)) = result[0].change(ChangeKind::Set) else {
            panic!("expected set change");
        };
        assert_eq!(sets.len(), 2);
    }

    #[test]
    fn test_map_parts() {
        let reference = PropertyReference::property(6);
        let mut agg = ChangeAggregator::new();
        agg.add(9, ChangePart::MapAdd { reference: reference.clone(), key: Value::text("a"), value: Value::Int64(1) });
        agg.add(9, ChangePart::MapDelete { reference: reference.clone(), key: Value::text("b") });

        let result = agg.finish();
        let Some(Change::Map(maps)) = result[0].change(ChangeKind::Map) else {
            panic!("expected map change");
        };
        assert_eq!(maps[0].reference, reference);
        assert_eq!(maps[0].values_to_add.get(&Value::text("a")), Some(&Value::Int64(1)));
        assert!(maps[0].keys_to_delete.contains(&Value::text("b")));
    }

    #[test]
    fn test_every_part_kind_builds_its_change() {
        let reference = PropertyReference::property(7);
        let mut agg = ChangeAggregator::new();
        agg.add(4, ChangePart::ObjectSoftDelete { is_deleted: true });
        agg.add(4, ChangePart::MapDelete { reference: reference.clone(), key: Value::Int32(1) });
        agg.add(4, ChangePart::ListDelete { reference: reference.clone(), index: 0 });
        agg.add(4, ChangePart::SetAdd { reference: reference.clone(), value: Value::Bool(true) });
        agg.add(4, ChangePart::Delete(PropertyReference::property(1)));
        agg.add(4, ChangePart::Delete(PropertyReference::property(1)));
        agg.add(4, ChangePart::ObjectSoftDelete { is_deleted: false });

        let result = agg.finish();
        let kinds: Vec<_> = result[0].changes.iter().map(Change::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::ObjectSoftDelete,
                ChangeKind::Map,
                ChangeKind::List,
                ChangeKind::Set,
                ChangeKind::Delete
            ]
        );
        assert_eq!(result[0].changes[0], Change::ObjectSoftDelete { is_deleted: false });
        assert_eq!(result[0].changes[4], Change::Delete(vec![PropertyReference::property(1)]));

        let mut list = ListChange::new(reference);
        list.delete_at_index.insert(0);
        assert_eq!(result[0].changes[2], Change::List(vec![list]));
    }

    proptest! {
        #[test]
        fn prop_versions_strictly_ascending(versions in proptest::collection::vec(0u64..50, 0..64)) {
            let mut agg = ChangeAggregator::new();
            for (i, version) in versions.iter().enumerate() {
                agg.add(*version, ChangePart::Delete(PropertyReference::property(i as u32 + 1)));
            }
            let result = agg.finish();
            prop_assert!(result.windows(2).all(|w| w[0].version < w[1].version));

            let mut expected: Vec<_> = versions.clone();
            expected.sort_unstable();
            expected.dedup();
            prop_assert_eq!(result.iter().map(|v| v.version).collect::<Vec<_>>(), expected);

            for entry in &result {
                prop_assert_eq!(entry.changes.len(), 1);
            }
        }
    }
}
