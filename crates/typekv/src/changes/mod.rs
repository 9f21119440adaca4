//! Versioned changes and their aggregation.

pub mod aggregator;
pub mod change;

pub use aggregator::ChangeAggregator;
pub use change::{
    Change, ChangeKind, ChangePart, ChangeValue, ListChange, MapChange, ReferenceValuePair, SetChange,
    VersionedChanges,
};
