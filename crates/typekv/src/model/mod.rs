//! Data model types.
//!
//! This module contains the typed building blocks the codecs work on:
//! - Values (typed scalars with a storage byte contract)
//! - Schemas (property definitions by index)
//! - References (paths to properties and nested positions)
//! - Object values and selections

pub mod reference;
pub mod schema;
pub mod selection;
pub mod value;
pub mod values;

pub use reference::{PropertyReference, ReferenceSegment};
pub use schema::{PropertyDefinition, PropertyKind, Schema, SchemaBuilder, TypeCase};
pub use selection::{SelectNode, Selection};
pub use value::{Date, DateTime, Time, TypedValue, Value, ValueType};
pub use values::{ObjectValues, PropertyValue};
