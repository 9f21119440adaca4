//! Filter trees over property references.

use std::collections::BTreeSet;

use crate::model::{PropertyReference, Value};

/// A filter over the values of an object.
///
/// Only the comparison leaves and `And` narrow a key scan; the other variants
/// are left to the caller's evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(PropertyReference, Value),
    GreaterThan(PropertyReference, Value),
    GreaterThanEquals(PropertyReference, Value),
    LessThan(PropertyReference, Value),
    LessThanEquals(PropertyReference, Value),
    Range {
        reference: PropertyReference,
        from: Value,
        from_inclusive: bool,
        to: Value,
        to_inclusive: bool,
    },
    ValueIn(PropertyReference, BTreeSet<Value>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists(PropertyReference),
    Prefix(PropertyReference, String),
    RegEx(PropertyReference, String),
}

impl Filter {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Equals(..) => "equals",
            Filter::GreaterThan(..) => "greater_than",
            Filter::GreaterThanEquals(..) => "greater_than_equals",
            Filter::LessThan(..) => "less_than",
            Filter::LessThanEquals(..) => "less_than_equals",
            Filter::Range { .. } => "range",
            Filter::ValueIn(..) => "value_in",
            Filter::And(_) => "and",
            Filter::Or(_) => "or",
            Filter::Not(_) => "not",
            Filter::Exists(_) => "exists",
            Filter::Prefix(..) => "prefix",
            Filter::RegEx(..) => "regex",
        }
    }

    /// Inclusive or exclusive range over one reference.
    pub fn range(reference: PropertyReference, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Filter::Range {
            reference,
            from: from.into(),
            from_inclusive: true,
            to: to.into(),
            to_inclusive: true,
        }
    }
}
