//! Reading and writing the stored cells of objects.
//!
//! - [`cell`]: qualifier classification and payload decoding
//! - [`walker`]: change reconstruction from a qualifier stream
//! - [`writer`]: typed values to stored cells
//! - [`memory`]: an ordered in-memory store over all of the above

pub mod cell;
pub mod memory;
pub mod stream;
pub mod walker;
pub mod writer;

pub use cell::{resolve_cell, StorageCell};
pub use memory::MemoryStore;
pub use stream::{CellStream, FnQualifierStream, QualifierStream, RecordConsumer};
pub use walker::read_changes_from_qualifiers;
pub use writer::write_values_to_storage;
