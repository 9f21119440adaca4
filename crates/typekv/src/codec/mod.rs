//! Binary encoding/decoding of qualifiers and stored records.
//!
//! - [`qualifier`]: property headers and nested sub-addresses
//! - [`storage`]: version prefixed records and their payloads
//! - [`value`]: order preserving scalar storage bytes
//! - [`primitives`]: varints and fixed-width integers

pub mod primitives;
pub mod qualifier;
pub mod storage;
pub mod value;

pub use primitives::{Reader, Writer};
pub use qualifier::{
    decode_header, decode_reference, encode_reference, is_at_end, CompleteReferenceType,
    ReferenceKind, SOFT_DELETE_QUALIFIER,
};
pub use storage::{encode_record, read_version, Version};
pub use value::{decode_storage_bytes, encode_storage_bytes};
