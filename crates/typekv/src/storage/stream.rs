//! Forward-only source of qualifiers and their stored records.

use crate::error::ReadError;

/// Receives the raw records of one qualifier, each `[u64 BE version][payload]`.
pub type RecordConsumer<'c> = dyn FnMut(&[u8]) -> Result<(), ReadError> + 'c;

/// A sorted store positioned on one object, yielding its qualifiers in
/// ascending byte order.
///
/// After every qualifier returned by [`next_qualifier`](Self::next_qualifier)
/// the reader calls [`read_records`](Self::read_records) exactly once, even
/// when it is not interested in the qualifier, so the source can advance.
pub trait QualifierStream {
    /// Returns the next qualifier, or `None` when the object has no more cells.
    fn next_qualifier(&mut self) -> Option<Vec<u8>>;

    /// Feeds every record of the current qualifier to `consumer`.
    fn read_records(&mut self, consumer: &mut RecordConsumer<'_>) -> Result<(), ReadError>;
}

/// Adapts a pair of closures to [`QualifierStream`].
pub struct FnQualifierStream<N, R> {
    next: N,
    read: R,
}

impl<N, R> FnQualifierStream<N, R>
where
    N: FnMut() -> Option<Vec<u8>>,
    R: FnMut(&mut RecordConsumer<'_>) -> Result<(), ReadError>,
{
    pub fn new(next: N, read: R) -> Self {
        Self { next, read }
    }
}

impl<N, R> QualifierStream for FnQualifierStream<N, R>
where
    N: FnMut() -> Option<Vec<u8>>,
    R: FnMut(&mut RecordConsumer<'_>) -> Result<(), ReadError>,
{
    fn next_qualifier(&mut self) -> Option<Vec<u8>> {
        (self.next)()
    }

    fn read_records(&mut self, consumer: &mut RecordConsumer<'_>) -> Result<(), ReadError> {
        (self.read)(consumer)
    }
}

/// A stream over owned cells: `(qualifier, records)` in ascending qualifier order.
#[derive(Debug, Clone, Default)]
pub struct CellStream {
    cells: Vec<(Vec<u8>, Vec<Vec<u8>>)>,
    next: usize,
}

impl CellStream {
    pub fn new(cells: Vec<(Vec<u8>, Vec<Vec<u8>>)>) -> Self {
        Self { cells, next: 0 }
    }
}

impl QualifierStream for CellStream {
    fn next_qualifier(&mut self) -> Option<Vec<u8>> {
        let (qualifier, _) = self.cells.get(self.next)?;
        self.next += 1;
        Some(qualifier.clone())
    }

    fn read_records(&mut self, consumer: &mut RecordConsumer<'_>) -> Result<(), ReadError> {
        let Some((_, records)) = self.next.checked_sub(1).and_then(|i| self.cells.get(i)) else {
            return Ok(());
        };
        for record in records {
            consumer(record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_stream_delegates() {
        let mut qualifiers = vec![vec![0x09], vec![0x11]].into_iter();
        let mut reads = 0;
        let mut stream = FnQualifierStream::new(
            move || qualifiers.next(),
            |consumer| {
                reads += 1;
                consumer(&[0, 0, 0, 0, 0, 0, 0, 1])
            },
        );

        let mut seen = Vec::new();
        while let Some(q) = stream.next_qualifier() {
            stream
                .read_records(&mut |record| {
                    seen.push((q.clone(), record.len()));
                    Ok(())
                })
                .unwrap();
        }
        drop(stream);
        assert_eq!(seen, vec![(vec![0x09], 8), (vec![0x11], 8)]);
        assert_eq!(reads, 2);
    }

    #[test]
    fn test_cell_stream_reads_current() {
        let mut stream = CellStream::new(vec![
            (vec![0x09], vec![vec![1], vec![2]]),
            (vec![0x11], vec![vec![3]]),
        ]);
        let mut collected = Vec::new();
        while stream.next_qualifier().is_some() {
            stream
                .read_records(&mut |record| {
                    collected.push(record[0]);
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(collected, vec![1, 2, 3]);
    }
}
