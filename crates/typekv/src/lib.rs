//! typekv: typed, versioned storage encoding for sorted key-value stores.
//!
//! This crate encodes the values of strongly typed objects as cells of a
//! sorted key-value store, reads them back as typed changes grouped by
//! version, and turns filters into byte ranges that narrow a key scan.
//!
//! # Overview
//!
//! Every property value of an object lives in its own cell:
//! - **Qualifier**: addresses the cell (property index, structural tag and
//!   any nested sub-address such as a list index or map key)
//! - **Record**: `[u64 version][payload]`; an empty payload is a deletion
//!
//! Reading a stream of qualifiers yields [`VersionedChanges`] in ascending
//! version order, with at most one [`Change`] of each kind per version.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use typekv::{MemoryStore, ObjectValues, Schema, Value, ValueType};
//!
//! let schema = Schema::builder("Note")
//!     .value(1, "title", ValueType::Text)
//!     .build()
//!     .unwrap();
//!
//! let mut store = MemoryStore::new(Arc::new(schema));
//! store
//!     .put(b"note-1", 1234, &ObjectValues::new().with(1, Value::text("hello world")))
//!     .unwrap();
//!
//! let changes = store.changes(b"note-1", 0, None).unwrap();
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].version, 1234);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Values, schemas, references, selections
//! - [`codec`]: Qualifier and record encoding
//! - [`changes`]: Change types and version aggregation
//! - [`storage`]: Stored cell reading and writing, in-memory store
//! - [`query`]: Filters, key definitions and scan ranges
//! - [`error`]: Error types
//! - [`limits`]: Format constants and decoder limits
//!
//! # Security
//!
//! The decoder is designed to safely handle untrusted input:
//! - Qualifier and prefixed value lengths are bounded by [`limits`]
//! - Varints are limited to prevent overflow
//! - Invalid data is rejected with descriptive errors

pub mod changes;
pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod query;
pub mod storage;
pub mod util;

// Re-export commonly used types at crate root
pub use changes::{
    Change, ChangeAggregator, ChangeValue, ListChange, MapChange, ReferenceValuePair, SetChange, VersionedChanges,
};
pub use codec::{decode_reference, encode_reference};
pub use error::{DecodeError, EncodeError, ReadError, SchemaError, StoreError};
pub use model::{
    ObjectValues, PropertyKind, PropertyReference, PropertyValue, Schema, SchemaBuilder, SelectNode, Selection,
    TypeCase, TypedValue, Value, ValueType,
};
pub use query::build_scan_range_from_filter;
pub use storage::{read_changes_from_qualifiers, write_values_to_storage, MemoryStore, QualifierStream};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
