//! Rayon helpers for per-path metrics.
//!
//! Results keep input order, so reductions over them are independent of
//! the thread count.

use rayon::prelude::*;

/// Minimum item count before work is split across threads.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

/// When to use the rayon pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Minimum items before using parallelism
    pub parallel_threshold: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ParallelConfig {
    /// Always parallel.
    pub fn always() -> Self {
        Self {
            parallel_threshold: 0,
        }
    }

    /// Never parallel.
    pub fn sequential() -> Self {
        Self {
            parallel_threshold: usize::MAX,
        }
    }

    /// Returns whether to use parallel processing for the given item count.
    #[inline]
    pub fn should_parallelise(&self, n_items: usize) -> bool {
        n_items >= self.parallel_threshold
    }

    /// Maps each item, in parallel above the threshold.
    pub fn map<T, R, F>(&self, items: &[T], mapper: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.should_parallelise(items.len()) {
            items.par_iter().map(mapper).collect()
        } else {
            items.iter().map(mapper).collect()
        }
    }
}

/// Parallel map preserving order.
pub fn parallel_map<T, R, F>(items: &[T], mapper: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.par_iter().map(mapper).collect()
}

/// Mean of a per-item statistic, ignoring undefined values.
///
/// Returns `None` when no item defines the statistic.
pub fn mean_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
