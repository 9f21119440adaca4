//! Property references: typed paths to a property or to a position inside it.

use std::fmt;

use crate::model::Value;

/// One step of a [`PropertyReference`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReferenceSegment {
    /// A property by index, top level or inside an embedded object.
    Property(u32),
    /// An item of a list.
    ListItem(u32),
    /// An item of a set.
    SetItem(Value),
    /// The value stored under a map key.
    MapValue(Value),
    /// The key of a map entry itself.
    MapKey(Value),
    /// The contents of one variant of a multi-type property.
    TypeCase(u32),
    /// The type discriminator of a multi-type property.
    TypeOf,
}

/// A path identifying a property or a nested position within one.
///
/// References compare structurally, which is how changes for the same
/// property are grouped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyReference {
    segments: Vec<ReferenceSegment>,
}

impl PropertyReference {
    /// Reference to a top-level property.
    pub fn property(index: u32) -> Self {
        Self {
            segments: vec![ReferenceSegment::Property(index)],
        }
    }

    /// Builds a reference from raw segments.
    pub fn from_segments(segments: Vec<ReferenceSegment>) -> Self {
        Self { segments }
    }

    fn push(mut self, segment: ReferenceSegment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Property `index` of the embedded object this reference points to.
    pub fn child(self, index: u32) -> Self {
        self.push(ReferenceSegment::Property(index))
    }

    pub fn list_item(self, index: u32) -> Self {
        self.push(ReferenceSegment::ListItem(index))
    }

    pub fn set_item(self, value: impl Into<Value>) -> Self {
        self.push(ReferenceSegment::SetItem(value.into()))
    }

    pub fn map_value(self, key: impl Into<Value>) -> Self {
        self.push(ReferenceSegment::MapValue(key.into()))
    }

    pub fn map_key(self, key: impl Into<Value>) -> Self {
        self.push(ReferenceSegment::MapKey(key.into()))
    }

    pub fn type_case(self, tag: u32) -> Self {
        self.push(ReferenceSegment::TypeCase(tag))
    }

    pub fn type_of(self) -> Self {
        self.push(ReferenceSegment::TypeOf)
    }

    pub fn segments(&self) -> &[ReferenceSegment] {
        &self.segments
    }

    /// Returns the last segment.
    pub fn last(&self) -> Option<&ReferenceSegment> {
        self.segments.last()
    }
}

impl fmt::Display for PropertyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                ReferenceSegment::Property(index) => write!(f, "{}", index)?,
                ReferenceSegment::ListItem(index) => write!(f, "@{}", index)?,
                ReferenceSegment::SetItem(value) => write_item(f, "#", value)?,
                ReferenceSegment::MapValue(key) => write_item(f, "$", key)?,
                ReferenceSegment::MapKey(key) => write_item(f, "~", key)?,
                ReferenceSegment::TypeCase(tag) => write!(f, "*{}", tag)?,
                ReferenceSegment::TypeOf => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

/// Text items are quoted so a `.` inside them cannot read as a separator.
fn write_item(f: &mut fmt::Formatter<'_>, marker: &str, value: &Value) -> fmt::Result {
    match value {
        Value::Text(text) => write!(f, "{}{:?}", marker, text),
        other => write!(f, "{}{}", marker, other),
    }
}
