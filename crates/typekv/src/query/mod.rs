//! Filters, key definitions and key scan ranges.

pub mod filter;
pub mod key;
pub mod partial;
pub mod range;

pub use filter::Filter;
pub use key::{KeyDefinition, KeyPart};
pub use partial::{KeyPartials, PartialKind, PartialToMatch, UniqueToMatch};
pub use range::{build_scan_range_from_filter, ScanRange};
