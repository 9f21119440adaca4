//! Error types for storage encoding, change reading and schema construction.

use thiserror::Error;

use crate::model::ValueType;
use crate::util::DateTimeParseError;

/// Error during binary decoding of qualifiers or stored records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    #[error("varint overflow (value exceeds u64)")]
    VarintOverflow,

    #[error("varint has a redundant trailing zero byte")]
    NonCanonicalVarint,

    #[error("property index {index} exceeds maximum")]
    IndexTooLarge { index: u64 },

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("invalid bool value: {value} (expected 0x00 or 0x01)")]
    InvalidBool { value: u8 },

    #[error("invalid reference kind tag: {tag}")]
    InvalidReferenceKind { tag: u8 },

    #[error("invalid complete reference type: {value}")]
    InvalidSpecialType { value: u8 },

    #[error("property {index} stored as {found} but defined as {expected}")]
    UnexpectedKind {
        index: u32,
        expected: &'static str,
        found: &'static str,
    },

    #[error("type tag {tag} not defined for multi-type property")]
    UnknownTypeTag { tag: u32 },

    #[error("{len} trailing bytes after {context}")]
    TrailingBytes { context: &'static str, len: usize },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("malformed encoding: {context}")]
    MalformedEncoding { context: &'static str },
}

/// Error during encoding of values, references or keys.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("value of type {found:?} cannot be stored as {expected:?}")]
    TypeMismatch { expected: ValueType, found: ValueType },

    #[error("property {index} not found in schema")]
    UnknownProperty { index: u32 },

    #[error("reference cannot be encoded: {context}")]
    InvalidReference { context: &'static str },

    #[error("value shape does not match property {index}: {context}")]
    ShapeMismatch { index: u32, context: &'static str },

    #[error("unsupported nested structure: {context}")]
    UnsupportedStructure { context: &'static str },

    #[error("empty value of property {index} would be stored as a deletion")]
    EmptyPayload { index: u32 },

    #[error("key part {part} is missing a value")]
    MissingKeyValue { part: usize },
}

/// Error while reading changes from a qualifier stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("property {index} not found in schema")]
    UnknownProperty { index: u32 },

    #[error("unsupported stored structure: {context}")]
    UnsupportedStructure { context: &'static str },
}

/// Error while building a schema or a key definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("property index {index} is reserved or out of range")]
    InvalidIndex { index: u32 },

    #[error("property index {index} defined twice")]
    DuplicateIndex { index: u32 },

    #[error("property name {name:?} defined twice")]
    DuplicateName { name: String },

    #[error("type tag {tag} defined twice")]
    DuplicateTypeTag { tag: u32 },

    #[error("key part {part} has no fixed byte size")]
    VariableKeyPart { part: usize },

    #[error("key definition has {count} parts, maximum is {max}")]
    TooManyKeyParts { count: usize, max: usize },

    #[error("key definition has no parts")]
    EmptyKey,

    #[error("property {index} is not a top-level scalar and cannot be a key part")]
    InvalidKeyPart { index: u32 },
}

/// Error from a memory store scan: building the range or reading changes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Error parsing a value from its text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseValueError {
    #[error("invalid {value_type:?} value: {input:?}")]
    Invalid { value_type: ValueType, input: String },

    #[error(transparent)]
    DateTime(#[from] DateTimeParseError),
}
