//! Byte constraints on single key parts.

use crate::model::{Value, ValueType};

/// Constraint on the stored bytes of one key part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialKind {
    /// Bytes equal exactly.
    Exact(Vec<u8>),
    /// Bytes sort after (or at, when inclusive) the bound.
    GreaterThan { bytes: Vec<u8>, inclusive: bool },
    /// Bytes sort before (or at, when inclusive) the bound.
    LessThan { bytes: Vec<u8>, inclusive: bool },
    /// Bytes equal one of the candidates, kept in ascending byte order.
    OneOf(Vec<Vec<u8>>),
}

/// A constraint on the key part at `part_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialToMatch {
    pub part_index: usize,
    /// Offset of the part in the key, when all earlier parts are fixed width.
    pub from_byte_index: Option<usize>,
    pub kind: PartialKind,
}

impl PartialToMatch {
    /// Checks the stored bytes of the part against this constraint.
    pub fn matches(&self, part: &[u8]) -> bool {
        match &self.kind {
            PartialKind::Exact(bytes) => part == bytes.as_slice(),
            PartialKind::GreaterThan { bytes, inclusive } => {
                part > bytes.as_slice() || (*inclusive && part == bytes.as_slice())
            }
            PartialKind::LessThan { bytes, inclusive } => {
                part < bytes.as_slice() || (*inclusive && part == bytes.as_slice())
            }
            PartialKind::OneOf(candidates) => candidates
                .binary_search_by(|c| c.as_slice().cmp(part))
                .is_ok(),
        }
    }
}

/// A direct lookup on a unique property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueToMatch {
    /// Qualifier bytes of the unique property.
    pub reference: Vec<u8>,
    pub value_type: ValueType,
    pub value: Value,
}

/// Everything a filter contributes to a key scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPartials {
    pub partials: Vec<PartialToMatch>,
    pub uniques: Vec<UniqueToMatch>,
}
