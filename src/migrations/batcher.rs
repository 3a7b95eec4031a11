use std::mem;

use crate::database::UserRecord;

/// A full-document write waiting for its batch
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub id: String,
    pub record: UserRecord,
}

impl PendingWrite {
    pub fn new(record: UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            record,
        }
    }
}

/// Splits a stream of writes into batches of at most `batch_size`.
///
/// The store fails a whole transaction that carries more writes than its
/// ceiling, so writes are grouped up front rather than on commit.
#[derive(Debug)]
pub struct WriteBatcher {
    batch_size: usize,
    current: Vec<PendingWrite>,
    operation_counter: usize,
    sealed: Vec<Vec<PendingWrite>>,
}

impl WriteBatcher {
    /// `batch_size` must be non-zero; the engine validates it first.
    pub fn new(batch_size: usize) -> Self {
        debug_assert!(batch_size > 0, "batch size must be positive");
        Self {
            batch_size,
            current: Vec::with_capacity(batch_size),
            operation_counter: 0,
            sealed: Vec::new(),
        }
    }

    pub fn push(&mut self, write: PendingWrite) {
        self.current.push(write);
        self.operation_counter += 1;

        if self.operation_counter == self.batch_size {
            let full = mem::replace(&mut self.current, Vec::with_capacity(self.batch_size));
            tracing::debug!("Sealed batch {} with {} writes", self.sealed.len(), full.len());
            self.sealed.push(full);
            self.operation_counter = 0;
        }
    }

    /// Total writes pushed so far
    pub fn total_writes(&self) -> usize {
        self.sealed.iter().map(Vec::len).sum::<usize>() + self.current.len()
    }

    /// Seal the trailing partial batch, if any, and hand back every batch
    pub fn finish(mut self) -> Vec<Vec<PendingWrite>> {
        if !self.current.is_empty() {
            self.sealed.push(self.current);
        }
        self.sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::user;

    fn writes(n: usize) -> impl Iterator<Item = PendingWrite> {
        (0..n).map(|i| PendingWrite::new(user(&format!("u{i}"), "x")))
    }

    fn sizes(batch_size: usize, n: usize) -> Vec<usize> {
        let mut batcher = WriteBatcher::new(batch_size);
        writes(n).for_each(|w| batcher.push(w));
        batcher.finish().iter().map(Vec::len).collect()
    }

    #[test]
    fn five_writes_in_batches_of_two() {
        assert_eq!(sizes(2, 5), vec![2, 2, 1]);
    }

    #[test]
    fn exact_multiple_leaves_no_empty_batch() {
        assert_eq!(sizes(2, 4), vec![2, 2]);
        assert_eq!(sizes(500, 1_000), vec![500, 500]);
    }

    #[test]
    fn no_writes_no_batches() {
        assert!(sizes(3, 0).is_empty());
    }

    #[test]
    fn batch_count_is_ceiling_of_writes_over_size() {
        for (b, n) in [(1, 7), (3, 7), (7, 7), (10, 7), (4, 9), (500, 1_201)] {
            let got = sizes(b, n);
            assert_eq!(got.len(), n.div_ceil(b), "b={b} n={n}");
            let (last, full) = got.split_last().unwrap();
            assert!(full.iter().all(|s| *s == b), "b={b} n={n}");
            assert!(*last >= 1 && *last <= b);
            assert_eq!(got.iter().sum::<usize>(), n);
        }
    }

    #[test]
    fn preserves_push_order() {
        let mut batcher = WriteBatcher::new(2);
        writes(3).for_each(|w| batcher.push(w));
        assert_eq!(batcher.total_writes(), 3);

        let ids: Vec<String> = batcher
            .finish()
            .into_iter()
            .flatten()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, ["u0", "u1", "u2"]);
    }
}
