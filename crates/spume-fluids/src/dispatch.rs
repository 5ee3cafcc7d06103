//! Parallel-for with an implicit barrier.
//!
//! Every stage of the pipeline is written against [`Dispatch`]: a call hands out one task per
//! element (or per element pair), and only returns once every task has finished. That return is
//! the barrier between stages, so a stage may read anything the previous stage wrote.
//!
//! Tasks are issued in groups of [`Dispatch::group_size`] elements. The number of groups is
//! rounded up, and tasks past the end of the data in the last group do nothing.

use rayon::prelude::*;
use thiserror::Error;

pub const DEFAULT_GROUP_SIZE: usize = 256;

pub trait Dispatch: Send + Sync {
    /// Number of tasks issued together.
    fn group_size(&self) -> usize;

    /// Number of groups needed to cover `len` tasks.
    fn groups(&self, len: usize) -> usize {
        len.div_ceil(self.group_size())
    }

    /// Runs `f(i)` for every `i` in `0..len`.
    fn for_range<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Send + Sync;

    /// Runs `f(chunk_index, chunk)` over disjoint chunks of `chunk_len` elements. The last chunk
    /// may be shorter.
    fn for_chunks<T, F>(&self, data: &mut [T], chunk_len: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync;

    /// Runs `f(i, &mut a[i], &mut b[i])` for every index of two equally long slices.
    fn for_each_zip<A, B, F>(&self, a: &mut [A], b: &mut [B], f: F)
    where
        A: Send,
        B: Send,
        F: Fn(usize, &mut A, &mut B) + Send + Sync;

    /// Compare-exchange dispatch. Splits `data` into runs of `2 * block` elements and runs
    /// `f(i, &mut data[i], &mut data[i + block])` for every lower slot `i` of every run. Each task
    /// owns its pair exclusively.
    fn for_pairs<T, F>(&self, data: &mut [T], block: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut T, &mut T) + Send + Sync;

    /// Runs `f(i, &mut data[i])` for every element.
    fn for_each<T, F>(&self, data: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Send + Sync,
    {
        let group_size = self.group_size();
        self.for_chunks(data, group_size, |group, items| {
            let base = group * group_size;
            for (k, item) in items.iter_mut().enumerate() {
                f(base + k, item);
            }
        });
    }
}

/// Runs every task on the calling thread, in index order.
#[derive(Debug, Clone, Copy)]
pub struct Serial {
    group_size: usize,
}

impl Serial {
    pub fn new(group_size: usize) -> Result<Self, DispatchError> {
        if group_size == 0 {
            return Err(DispatchError::ZeroGroupSize);
        }

        Ok(Self { group_size })
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self { group_size: DEFAULT_GROUP_SIZE }
    }
}

impl Dispatch for Serial {
    fn group_size(&self) -> usize {
        self.group_size
    }

    fn for_range<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        for group in 0..self.groups(len) {
            for i in group * self.group_size..(group + 1) * self.group_size {
                if i < len {
                    f(i);
                }
            }
        }
    }

    fn for_chunks<T, F>(&self, data: &mut [T], chunk_len: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        for (chunk, items) in data.chunks_mut(chunk_len).enumerate() {
            f(chunk, items);
        }
    }

    fn for_each_zip<A, B, F>(&self, a: &mut [A], b: &mut [B], f: F)
    where
        A: Send,
        B: Send,
        F: Fn(usize, &mut A, &mut B) + Send + Sync,
    {
        debug_assert_eq!(a.len(), b.len());

        for (i, (a, b)) in a.iter_mut().zip(b.iter_mut()).enumerate() {
            f(i, a, b);
        }
    }

    fn for_pairs<T, F>(&self, data: &mut [T], block: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut T, &mut T) + Send + Sync,
    {
        let run_len = 2 * block;

        for (run, items) in data.chunks_exact_mut(run_len).enumerate() {
            let (lower, upper) = items.split_at_mut(block);
            for (k, (a, b)) in lower.iter_mut().zip(upper.iter_mut()).enumerate() {
                f(run * run_len + k, a, b);
            }
        }
    }
}

/// Runs tasks on a dedicated `rayon` pool, one rayon job per group.
#[derive(Debug)]
pub struct ThreadPool {
    pool: rayon::ThreadPool,
    group_size: usize,
}

impl ThreadPool {
    /// Builds a pool with `threads` workers. `0` lets rayon pick one per logical core.
    pub fn new(threads: usize, group_size: usize) -> Result<Self, DispatchError> {
        if group_size == 0 {
            return Err(DispatchError::ZeroGroupSize);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("spume-worker-{i}"))
            .build()?;

        log::debug!("started dispatch pool with {} threads", pool.current_num_threads());

        Ok(Self { pool, group_size })
    }
}

impl Dispatch for ThreadPool {
    fn group_size(&self) -> usize {
        self.group_size
    }

    fn for_range<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        let group_size = self.group_size;
        let groups = self.groups(len);

        self.pool.install(|| {
            (0..groups).into_par_iter().for_each(|group| {
                for i in group * group_size..(group + 1) * group_size {
                    if i < len {
                        f(i);
                    }
                }
            });
        });
    }

    fn for_chunks<T, F>(&self, data: &mut [T], chunk_len: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        self.pool.install(|| {
            data.par_chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(chunk, items)| f(chunk, items));
        });
    }

    fn for_each_zip<A, B, F>(&self, a: &mut [A], b: &mut [B], f: F)
    where
        A: Send,
        B: Send,
        F: Fn(usize, &mut A, &mut B) + Send + Sync,
    {
        debug_assert_eq!(a.len(), b.len());
        let group_size = self.group_size;

        self.pool.install(|| {
            a.par_chunks_mut(group_size)
                .zip(b.par_chunks_mut(group_size))
                .enumerate()
                .for_each(|(group, (a, b))| {
                    let base = group * group_size;
                    for (k, (a, b)) in a.iter_mut().zip(b.iter_mut()).enumerate() {
                        f(base + k, a, b);
                    }
                });
        });
    }

    fn for_pairs<T, F>(&self, data: &mut [T], block: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut T, &mut T) + Send + Sync,
    {
        let run_len = 2 * block;
        let group_size = self.group_size;

        self.pool.install(|| {
            data.par_chunks_exact_mut(run_len)
                .enumerate()
                .for_each(|(run, items)| {
                    let (lower, upper) = items.split_at_mut(block);
                    lower.par_iter_mut()
                        .zip(upper.par_iter_mut())
                        .enumerate()
                        .with_min_len(group_size)
                        .for_each(|(k, (a, b))| f(run * run_len + k, a, b));
                });
        });
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch group size must be non-zero")]
    ZeroGroupSize,
    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
