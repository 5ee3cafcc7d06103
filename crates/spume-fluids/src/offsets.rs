use std::sync::atomic::{AtomicU32, Ordering};

use crate::{dispatch::Dispatch, hash::IndexKeyPair};

/// Marks a key with no particles.
pub const EMPTY: u32 = u32::MAX;

/// Start of each key's run in the sorted pair array.
///
/// Slots are atomics because the build scatters: task `i` writes slot `key[i]`. Every key has a
/// single run start, so no slot is written twice in one build.
#[derive(Debug)]
pub struct CellOffsetTable {
    starts: Vec<AtomicU32>,
}

impl CellOffsetTable {
    pub fn new(len: usize) -> Self {
        Self {
            starts: (0..len).map(|_| AtomicU32::new(EMPTY)).collect(),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Rebuilds the table from a key-sorted pair array.
    pub fn build<X: Dispatch>(&mut self, dispatch: &X, sorted: &[IndexKeyPair]) {
        dispatch.for_each(&mut self.starts, |_, start| *start.get_mut() = EMPTY);

        let starts = &self.starts;
        dispatch.for_range(sorted.len(), |i| {
            let key = sorted[i].key;
            if i == 0 || sorted[i - 1].key != key {
                starts[key as usize].store(i as u32, Ordering::Relaxed);
            }
        });
    }

    /// Index of the first sorted pair with `key`, if any.
    #[inline]
    pub fn start(&self, key: u32) -> Option<usize> {
        let start = self.starts.get(key as usize)?.load(Ordering::Relaxed);
        (start != EMPTY).then_some(start as usize)
    }

    /// The contiguous run of `sorted` carrying `key`.
    pub fn run<'a>(&self, sorted: &'a [IndexKeyPair], key: u32) -> &'a [IndexKeyPair] {
        let Some(start) = self.start(key) else {
            return &[];
        };

        let len = sorted[start..].iter().take_while(|pair| pair.key == key).count();
        &sorted[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use crate::dispatch::{Serial, ThreadPool};

    use super::*;

    fn pairs(keys: &[u32]) -> Vec<IndexKeyPair> {
        keys.iter().enumerate().map(|(i, &key)| IndexKeyPair { index: i as u32, key }).collect()
    }

    #[test]
    fn test_offsets_mark_run_starts() {
        let sorted = pairs(&[0, 0, 2, 2, 2, 5, 7, 7]);
        let mut table = CellOffsetTable::new(8);
        table.build(&Serial::new(3).unwrap(), &sorted);

        assert_eq!(table.start(0), Some(0));
        assert_eq!(table.start(1), None);
        assert_eq!(table.start(2), Some(2));
        assert_eq!(table.start(5), Some(5));
        assert_eq!(table.start(7), Some(6));
        assert_eq!(table.start(8), None);

        assert_eq!(table.run(&sorted, 2).len(), 3);
        assert_eq!(table.run(&sorted, 7).len(), 2);
        assert!(table.run(&sorted, 4).is_empty());
    }

    #[test]
    fn test_rebuild_clears_stale_entries() {
        let mut table = CellOffsetTable::new(4);
        let dispatch = ThreadPool::new(2, 2).unwrap();

        table.build(&dispatch, &pairs(&[0, 1, 2, 3]));
        assert_eq!(table.start(3), Some(3));

        table.build(&dispatch, &pairs(&[1, 1, 1, 1]));
        assert_eq!(table.start(1), Some(0));
        assert_eq!(table.start(3), None);
        assert_eq!(table.run(&pairs(&[1, 1, 1, 1]), 1).len(), 4);
    }
}
