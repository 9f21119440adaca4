//! Reconstructs versioned changes from a stream of stored qualifiers.

use tracing::{debug, trace};

use crate::changes::{ChangeAggregator, VersionedChanges};
use crate::codec::storage::read_version;
use crate::error::ReadError;
use crate::model::{Schema, Selection};
use crate::storage::cell::resolve_cell;
use crate::storage::stream::QualifierStream;

/// Reads all qualifiers of one object and returns its changes, ascending by
/// version.
///
/// With a `selection`, qualifiers of unselected properties are skipped; their
/// records are still drained so the stream stays aligned.
pub fn read_changes_from_qualifiers<S>(
    schema: &Schema,
    stream: &mut S,
    selection: Option<&Selection>,
) -> Result<Vec<VersionedChanges>, ReadError>
where
    S: QualifierStream + ?Sized,
{
    let mut aggregator = ChangeAggregator::new();
    let mut qualifiers = 0usize;
    let mut skipped = 0usize;

    while let Some(qualifier) = stream.next_qualifier() {
        qualifiers += 1;
        let cell = resolve_cell(schema, &qualifier, selection)?;

        match cell {
            Some(cell) => stream.read_records(&mut |record: &[u8]| {
                let (version, payload) = read_version(record)?;
                if let Some(part) = cell.read_payload(payload)? {
                    aggregator.add(version, part);
                }
                Ok(())
            })?,
            None => {
                skipped += 1;
                trace!(qualifier = %hex::encode(&qualifier), "skipping unselected qualifier");
                stream.read_records(&mut |_: &[u8]| Ok(()))?;
            }
        }
    }

    debug!(
        schema = schema.name(),
        qualifiers,
        skipped,
        versions = aggregator.len(),
        "read changes from qualifiers"
    );
    Ok(aggregator.finish())
}
