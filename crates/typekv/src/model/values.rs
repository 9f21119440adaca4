//! Typed values of a single object, keyed by property index.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::Value;

/// The value of one property of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Value(Value),
    List(Vec<Value>),
    Set(BTreeSet<Value>),
    Map(BTreeMap<Value, Value>),
    /// A multi-type value: the variant tag and its contents.
    Typed { tag: u32, value: Box<PropertyValue> },
    Embed(ObjectValues),
}

impl PropertyValue {
    /// Shorthand for a multi-type value.
    pub fn typed(tag: u32, value: impl Into<PropertyValue>) -> Self {
        PropertyValue::Typed {
            tag,
            value: Box::new(value.into()),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(v: Value) -> Self {
        PropertyValue::Value(v)
    }
}

impl From<ObjectValues> for PropertyValue {
    fn from(v: ObjectValues) -> Self {
        PropertyValue::Embed(v)
    }
}

/// Values of one object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectValues {
    values: BTreeMap<u32, PropertyValue>,
}

impl ObjectValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value and returns self, for chained construction.
    pub fn with(mut self, index: u32, value: impl Into<PropertyValue>) -> Self {
        self.values.insert(index, value.into());
        self
    }

    pub fn insert(&mut self, index: u32, value: impl Into<PropertyValue>) -> Option<PropertyValue> {
        self.values.insert(index, value.into())
    }

    pub fn get(&self, index: u32) -> Option<&PropertyValue> {
        self.values.get(&index)
    }

    /// Iterates values in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
