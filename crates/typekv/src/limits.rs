//! Format constants and decoder limits.

/// Maximum bytes in a varint (enough for a u64).
pub const MAX_VARINT_BYTES: usize = 10;

/// Number of low bits in a qualifier header reserved for the reference kind.
pub const TYPE_TAG_BITS: u32 = 3;

/// Mask selecting the reference kind bits of a qualifier header.
pub const TYPE_TAG_MASK: u64 = (1 << TYPE_TAG_BITS) - 1;

/// Width of the version prefix of every stored value record.
pub const VERSION_BYTES: usize = 8;

/// Width of a list index inside a qualifier.
pub const LIST_INDEX_BYTES: usize = 4;

/// Largest property index that can be addressed.
pub const MAX_PROPERTY_INDEX: u32 = u32::MAX >> TYPE_TAG_BITS;

/// Largest multi-type tag that can be addressed.
pub const MAX_TYPE_TAG: u32 = MAX_PROPERTY_INDEX;

/// Maximum number of parts in a key or index definition.
pub const MAX_KEY_PARTS: usize = 32;

/// Maximum qualifier length accepted by the decoder (64 KiB).
pub const MAX_QUALIFIER_LEN: usize = 64 * 1024;
