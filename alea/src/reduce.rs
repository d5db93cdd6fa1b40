use rayon::prelude::*;

use crate::error::Result;
use crate::statistics::Merge;

/// Combine worker-local accumulators or results into one, optionally in
/// parallel.
///
/// With `sequential` false the parts are tree-reduced on the rayon pool;
/// otherwise they are folded left to right on the current thread (best when
/// the caller already saturates the cores). Merge is associative and
/// commutative for mean, variance and covariance, so both paths agree up to
/// rounding. Returns `Ok(None)` for an empty slice.
pub fn merge_all<T>(parts: &[T], sequential: bool) -> Result<Option<T>>
where
    T: Merge + Clone + Send + Sync,
{
    tracing::debug!(parts = parts.len(), sequential, "reducing worker results");

    let combine = |mut acc: T, next: T| -> Result<T> {
        acc.merge(&next)?;
        Ok(acc)
    };

    if sequential {
        let mut iter = parts.iter().cloned();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        return iter.try_fold(first, combine).map(Some);
    }

    parts
        .par_iter()
        .cloned()
        .map(Ok)
        .try_reduce_with(combine)
        .transpose()
}
