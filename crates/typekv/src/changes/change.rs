//! Typed changes reconstructed from stored records.
//!
//! All changes of an object are grouped by version. Within one version there
//! is at most one [`Change`] of each kind.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::codec::storage::Version;
use crate::model::{PropertyReference, TypedValue, Value};

/// The value set on a reference: a plain scalar or a multi-type value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeValue {
    Value(Value),
    Typed(TypedValue),
}

impl From<Value> for ChangeValue {
    fn from(v: Value) -> Self {
        ChangeValue::Value(v)
    }
}

impl From<TypedValue> for ChangeValue {
    fn from(v: TypedValue) -> Self {
        ChangeValue::Typed(v)
    }
}

/// A value set on a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceValuePair {
    pub reference: PropertyReference,
    pub value: ChangeValue,
}

impl ReferenceValuePair {
    pub fn new(reference: PropertyReference, value: impl Into<ChangeValue>) -> Self {
        Self {
            reference,
            value: value.into(),
        }
    }
}

/// Changes to one list property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChange {
    pub reference: PropertyReference,
    pub delete_at_index: BTreeSet<u32>,
    pub add_values_at_index: BTreeMap<u32, Value>,
}

impl ListChange {
    pub fn new(reference: PropertyReference) -> Self {
        Self {
            reference,
            delete_at_index: BTreeSet::new(),
            add_values_at_index: BTreeMap::new(),
        }
    }
}

/// Changes to one set property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetChange {
    pub reference: PropertyReference,
    pub add_values: BTreeSet<Value>,
    pub delete_values: BTreeSet<Value>,
}

impl SetChange {
    pub fn new(reference: PropertyReference) -> Self {
        Self {
            reference,
            add_values: BTreeSet::new(),
            delete_values: BTreeSet::new(),
        }
    }
}

/// Changes to one map property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapChange {
    pub reference: PropertyReference,
    pub values_to_add: BTreeMap<Value, Value>,
    pub keys_to_delete: BTreeSet<Value>,
}

impl MapChange {
    pub fn new(reference: PropertyReference) -> Self {
        Self {
            reference,
            values_to_add: BTreeMap::new(),
            keys_to_delete: BTreeSet::new(),
        }
    }
}

/// A group of changes of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Scalar(Vec<ReferenceValuePair>),
    Delete(Vec<PropertyReference>),
    List(Vec<ListChange>),
    Set(Vec<SetChange>),
    Map(Vec<MapChange>),
    /// The object soft delete flag was set or cleared.
    ObjectSoftDelete { is_deleted: bool },
}

/// Discriminant of [`Change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKind {
    Scalar,
    Delete,
    List,
    Set,
    Map,
    ObjectSoftDelete,
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Scalar(_) => ChangeKind::Scalar,
            Change::Delete(_) => ChangeKind::Delete,
            Change::List(_) => ChangeKind::List,
            Change::Set(_) => ChangeKind::Set,
            Change::Map(_) => ChangeKind::Map,
            Change::ObjectSoftDelete { .. } => ChangeKind::ObjectSoftDelete,
        }
    }
}

/// A single contribution read from one stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePart {
    Scalar(ReferenceValuePair),
    Delete(PropertyReference),
    ListAdd {
        reference: PropertyReference,
        index: u32,
        value: Value,
    },
    ListDelete {
        reference: PropertyReference,
        index: u32,
    },
    SetAdd {
        reference: PropertyReference,
        value: Value,
    },
    SetDelete {
        reference: PropertyReference,
        value: Value,
    },
    MapAdd {
        reference: PropertyReference,
        key: Value,
        value: Value,
    },
    MapDelete {
        reference: PropertyReference,
        key: Value,
    },
    ObjectSoftDelete {
        is_deleted: bool,
    },
}

impl ChangePart {
    /// Kind of change this part merges into.
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangePart::Scalar(_) => ChangeKind::Scalar,
            ChangePart::Delete(_) => ChangeKind::Delete,
            ChangePart::ListAdd { .. } | ChangePart::ListDelete { .. } => ChangeKind::List,
            ChangePart::SetAdd { .. } | ChangePart::SetDelete { .. } => ChangeKind::Set,
            ChangePart::MapAdd { .. } | ChangePart::MapDelete { .. } => ChangeKind::Map,
            ChangePart::ObjectSoftDelete { .. } => ChangeKind::ObjectSoftDelete,
        }
    }
}

/// All changes recorded at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedChanges {
    pub version: Version,
    pub changes: Vec<Change>,
}

impl VersionedChanges {
    pub fn new(version: Version, changes: Vec<Change>) -> Self {
        Self { version, changes }
    }

    /// Returns the change of `kind`, if any.
    pub fn change(&self, kind: ChangeKind) -> Option<&Change> {
        self.changes.iter().find(|c| c.kind() == kind)
    }
}

impl fmt::Display for ChangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeValue::Value(v) => write!(f, "{}", v),
            ChangeValue::Typed(TypedValue { tag, value: Some(v) }) => write!(f, "{}({})", tag, v),
            ChangeValue::Typed(TypedValue { tag, value: None }) => write!(f, "{}(..)", tag),
        }
    }
}

impl fmt::Display for VersionedChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version {}:", self.version)?;
        for change in &self.changes {
            match change {
                Change::Scalar(pairs) => {
                    for pair in pairs {
                        writeln!(f, "  set {} = {}", pair.reference, pair.value)?;
                    }
                }
                Change::Delete(references) => {
                    for reference in references {
                        writeln!(f, "  delete {}", reference)?;
                    }
                }
                Change::List(lists) => {
                    for list in lists {
                        for (index, value) in &list.add_values_at_index {
                            writeln!(f, "  list {} @{} = {}", list.reference, index, value)?;
                        }
                        for index in &list.delete_at_index {
                            writeln!(f, "  list {} @{} removed", list.reference, index)?;
                        }
                    }
                }
                Change::Set(sets) => {
                    for set in sets {
                        for value in &set.add_values {
                            writeln!(f, "  set {} += {}", set.reference, value)?;
                        }
                        for value in &set.delete_values {
                            writeln!(f, "  set {} -= {}", set.reference, value)?;
                        }
                    }
                }
                Change::Map(maps) => {
                    for map in maps {
                        for (key, value) in &map.values_to_add {
                            writeln!(f, "  map {} [{}] = {}", map.reference, key, value)?;
                        }
                        for key in &map.keys_to_delete {
                            writeln!(f, "  map {} [{}] removed", map.reference, key)?;
                        }
                    }
                }
                Change::ObjectSoftDelete { is_deleted } => {
                    writeln!(f, "  object deleted = {}", is_deleted)?;
                }
            }
        }
        Ok(())
    }
}
