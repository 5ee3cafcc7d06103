//! Bitonic sorting network over [`IndexKeyPair`]s.
//!
//! The network only sorts power-of-two lengths. Callers sort a padded buffer whose tail holds
//! [`IndexKeyPair::SENTINEL`]s; the sentinels carry the largest key and end up past the real
//! pairs.

use crate::{dispatch::Dispatch, hash::IndexKeyPair};

/// Length of the sort buffer needed for `n` pairs, or `None` on overflow.
pub fn padded_len(n: usize) -> Option<usize> {
    n.max(1).checked_next_power_of_two()
}

/// Sorts `pairs` ascending by key. `pairs.len()` must be a power of two.
///
/// Runs `log2(n) * (log2(n) + 1) / 2` compare-exchange passes, each one dispatch.
pub fn bitonic_sort<X: Dispatch>(dispatch: &X, pairs: &mut [IndexKeyPair]) {
    let len = pairs.len();
    debug_assert!(len.is_power_of_two(), "bitonic sort of {len} pairs");

    let mut dim = 2;
    while dim <= len {
        let mut block = dim >> 1;
        while block > 0 {
            dispatch.for_pairs(pairs, block, |i, a, b| {
                let ascending = (i & dim) == 0;
                if (ascending && a.key > b.key) || (!ascending && a.key < b.key) {
                    std::mem::swap(a, b);
                }
            });
            block >>= 1;
        }
        dim <<= 1;
    }
}
