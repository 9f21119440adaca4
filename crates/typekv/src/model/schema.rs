//! Schema registry: property definitions addressable by integer index.
//!
//! A [`Schema`] is passed explicitly into every read, write and range build;
//! there is no global model registry.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::codec::qualifier::ReferenceKind;
use crate::error::SchemaError;
use crate::limits::{MAX_PROPERTY_INDEX, MAX_TYPE_TAG};
use crate::model::{PropertyReference, ReferenceSegment, ValueType};

/// Structural kind of a property, with the definitions of its contents.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// A single scalar value.
    Value(ValueType),
    /// An ordered list; items are addressed by a fixed-width index.
    List(Box<PropertyKind>),
    /// A set of scalar values; the value is its own key.
    Set(ValueType),
    /// A map from scalar keys to values.
    Map {
        key: ValueType,
        value: Box<PropertyKind>,
    },
    /// A union over tagged variants.
    MultiType(Vec<TypeCase>),
    /// An embedded object with its own schema.
    Embed(Arc<Schema>),
}

impl PropertyKind {
    /// Short name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyKind::Value(_) => "value",
            PropertyKind::List(_) => "list",
            PropertyKind::Set(_) => "set",
            PropertyKind::Map { .. } => "map",
            PropertyKind::MultiType(_) => "multi-type",
            PropertyKind::Embed(_) => "embed",
        }
    }

    /// Reference kind written into qualifier headers for this property.
    pub fn reference_kind(&self) -> ReferenceKind {
        match self {
            PropertyKind::Value(_) | PropertyKind::MultiType(_) => ReferenceKind::Value,
            PropertyKind::List(_) => ReferenceKind::List,
            PropertyKind::Set(_) => ReferenceKind::Set,
            PropertyKind::Map { .. } => ReferenceKind::Map,
            PropertyKind::Embed(_) => ReferenceKind::Embed,
        }
    }

    /// Returns the scalar type if this is a simple value.
    pub fn as_value_type(&self) -> Option<ValueType> {
        match self {
            PropertyKind::Value(value_type) => Some(*value_type),
            _ => None,
        }
    }

    /// Looks up a variant of a multi-type property.
    pub fn type_case(&self, tag: u32) -> Option<&TypeCase> {
        match self {
            PropertyKind::MultiType(cases) => cases.iter().find(|c| c.tag == tag),
            _ => None,
        }
    }
}

/// One variant of a multi-type property.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCase {
    pub tag: u32,
    pub name: String,
    pub kind: PropertyKind,
}

impl TypeCase {
    pub fn new(tag: u32, name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            tag,
            name: name.into(),
            kind,
        }
    }
}

/// A property definition in the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    /// Index of the property, unique within its schema. 0 is reserved.
    pub index: u32,
    pub name: String,
    pub kind: PropertyKind,
    /// Values of this property are unique across objects and can be looked up directly.
    pub unique: bool,
}

/// A named set of property definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    /// Sorted by index.
    properties: Vec<PropertyDefinition>,
    by_index: FxHashMap<u32, usize>,
}

impl Schema {
    /// Starts building a schema.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a property definition by index.
    pub fn property(&self, index: u32) -> Option<&PropertyDefinition> {
        self.by_index.get(&index).map(|&pos| &self.properties[pos])
    }

    /// All properties in index order.
    pub fn properties(&self) -> &[PropertyDefinition] {
        &self.properties
    }

    /// Resolves a reference made of property and type-case segments to the
    /// definition of the property it ends on.
    pub fn resolve(&self, reference: &PropertyReference) -> Option<&PropertyDefinition> {
        let mut schema = self;
        let mut current: Option<&PropertyDefinition> = None;
        let mut kind: Option<&PropertyKind> = None;

        for segment in reference.segments() {
            match segment {
                ReferenceSegment::Property(index) => {
                    if let Some(k) = kind {
                        schema = match k {
                            PropertyKind::Embed(embedded) => embedded.as_ref(),
                            _ => return None,
                        };
                    }
                    let def = schema.property(*index)?;
                    current = Some(def);
                    kind = Some(&def.kind);
                }
                ReferenceSegment::TypeCase(tag) => {
                    kind = Some(&kind?.type_case(*tag)?.kind);
                    current = None;
                }
                _ => return None,
            }
        }
        current
    }
}

/// Builder for constructing a [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    properties: Vec<PropertyDefinition>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Adds a property of any kind.
    pub fn property(mut self, index: u32, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.properties.push(PropertyDefinition {
            index,
            name: name.into(),
            kind,
            unique: false,
        });
        self
    }

    /// Adds a scalar property.
    pub fn value(self, index: u32, name: impl Into<String>, value_type: ValueType) -> Self {
        self.property(index, name, PropertyKind::Value(value_type))
    }

    /// Adds a scalar property whose values are unique across objects.
    pub fn unique_value(mut self, index: u32, name: impl Into<String>, value_type: ValueType) -> Self {
        self.properties.push(PropertyDefinition {
            index,
            name: name.into(),
            kind: PropertyKind::Value(value_type),
            unique: true,
        });
        self
    }

    /// Adds a list of scalar values.
    pub fn list(self, index: u32, name: impl Into<String>, item: ValueType) -> Self {
        self.property(index, name, PropertyKind::List(Box::new(PropertyKind::Value(item))))
    }

    /// Adds a set of scalar values.
    pub fn set(self, index: u32, name: impl Into<String>, item: ValueType) -> Self {
        self.property(index, name, PropertyKind::Set(item))
    }

    /// Adds a map from scalar keys to scalar values.
    pub fn map(self, index: u32, name: impl Into<String>, key: ValueType, value: ValueType) -> Self {
        self.property(
            index,
            name,
            PropertyKind::Map {
                key,
                value: Box::new(PropertyKind::Value(value)),
            },
        )
    }

    /// Adds a multi-type property.
    pub fn multi_type(self, index: u32, name: impl Into<String>, cases: Vec<TypeCase>) -> Self {
        self.property(index, name, PropertyKind::MultiType(cases))
    }

    /// Adds an embedded object property.
    pub fn embed(self, index: u32, name: impl Into<String>, schema: Arc<Schema>) -> Self {
        self.property(index, name, PropertyKind::Embed(schema))
    }

    /// Validates and builds the schema.
    pub fn build(mut self) -> Result<Schema, SchemaError> {
        self.properties.sort_by_key(|p| p.index);

        let mut by_index = FxHashMap::with_capacity_and_hasher(self.properties.len(), Default::default());
        let mut names = rustc_hash::FxHashSet::default();
        for (pos, def) in self.properties.iter().enumerate() {
            if def.index == 0 || def.index > MAX_PROPERTY_INDEX {
                return Err(SchemaError::InvalidIndex { index: def.index });
            }
            if by_index.insert(def.index, pos).is_some() {
                return Err(SchemaError::DuplicateIndex { index: def.index });
            }
            if !names.insert(def.name.as_str()) {
                return Err(SchemaError::DuplicateName {
                    name: def.name.clone(),
                });
            }
            validate_kind(&def.kind)?;
        }

        Ok(Schema {
            name: self.name,
            properties: self.properties,
            by_index,
        })
    }
}

fn validate_kind(kind: &PropertyKind) -> Result<(), SchemaError> {
    match kind {
        PropertyKind::List(item) => validate_kind(item),
        PropertyKind::Map { value, .. } => validate_kind(value),
        PropertyKind::MultiType(cases) => {
            let mut tags = rustc_hash::FxHashSet::default();
            for case in cases {
                if case.tag > MAX_TYPE_TAG || !tags.insert(case.tag) {
                    return Err(SchemaError::DuplicateTypeTag { tag: case.tag });
                }
                validate_kind(&case.kind)?;
            }
            Ok(())
        }
        PropertyKind::Value(_) | PropertyKind::Set(_) | PropertyKind::Embed(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("Address")
                .value(1, "street", ValueType::Text)
                .value(2, "number", ValueType::UInt32)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_lookup_by_index() {
        let schema = Schema::builder("Person")
            .value(2, "age", ValueType::UInt32)
            .value(1, "name", ValueType::Text)
            .build()
            .unwrap();

        assert_eq!(schema.property(1).unwrap().name, "name");
        assert!(schema.property(3).is_none());
        let indices: Vec<u32> = schema.properties().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_reserved_and_duplicate_indices() {
        let err = Schema::builder("X").value(0, "a", ValueType::Bool).build();
        assert_eq!(err, Err(SchemaError::InvalidIndex { index: 0 }));

        let err = Schema::builder("X")
            .value(1, "a", ValueType::Bool)
            .value(1, "b", ValueType::Bool)
            .build();
        assert_eq!(err, Err(SchemaError::DuplicateIndex { index: 1 }));

        let err = Schema::builder("X")
            .value(1, "a", ValueType::Bool)
            .value(2, "a", ValueType::Bool)
            .build();
        assert!(matches!(err, Err(SchemaError::DuplicateName { .. })));
    }

    #[test]
    fn test_duplicate_type_tags() {
        let err = Schema::builder("X")
            .multi_type(
                1,
                "m",
                vec![
                    TypeCase::new(1, "a", PropertyKind::Value(ValueType::Text)),
                    TypeCase::new(1, "b", PropertyKind::Value(ValueType::Bool)),
                ],
            )
            .build();
        assert_eq!(err, Err(SchemaError::DuplicateTypeTag { tag: 1 }));
    }

    #[test]
    fn test_resolve_nested_reference() {
        let schema = Schema::builder("Person")
            .embed(1, "address", address_schema())
            .multi_type(
                2,
                "contact",
                vec![TypeCase::new(1, "home", PropertyKind::Embed(address_schema()))],
            )
            .build()
            .unwrap();

        let street = PropertyReference::property(1).child(1);
        assert_eq!(schema.resolve(&street).unwrap().name, "street");

        let via_type = PropertyReference::property(2).type_case(1).child(2);
        assert_eq!(schema.resolve(&via_type).unwrap().name, "number");

        assert!(schema.resolve(&PropertyReference::property(1).child(9)).is_none());
        assert!(schema.resolve(&PropertyReference::property(2).type_case(1)).is_none());
    }
}
