//! Splitting `[1, n]` into contiguous chunks.

use crate::config::MAX_CHUNKS;
use crate::error::{Error, Result};
use crate::types::SubRange;

/// Split `[1, n]` into `k` contiguous, non-overlapping sub-ranges.
///
/// Every chunk except the last holds exactly `n / k` numbers; the last one
/// absorbs the remainder `n % k`. When `n < k` the leading chunks are empty
/// (`start > end`) and the last one covers everything.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `n == 0` or `k` is outside `1..=128`.
///
/// # Example
///
/// ```
/// use prime_counter::partition::partition;
///
/// let ranges = partition(100, 3).unwrap();
/// let bounds: Vec<_> = ranges.iter().map(|r| (r.start, r.end)).collect();
/// assert_eq!(bounds, vec![(1, 33), (34, 66), (67, 100)]);
/// ```
pub fn partition(n: u64, k: u32) -> Result<Vec<SubRange>> {
    if n == 0 {
        return Err(Error::validation("n", "must be at least 1"));
    }
    if k == 0 || k > MAX_CHUNKS {
        return Err(Error::validation(
            "chunks",
            format!("must be between 1 and {}", MAX_CHUNKS),
        ));
    }

    let chunk_size = n / u64::from(k);
    let ranges = (0..k)
        .map(|i| {
            let idx = u64::from(i);
            let start = idx * chunk_size + 1;
            let end = if i == k - 1 {
                n
            } else {
                (idx + 1) * chunk_size
            };
            SubRange {
                index: i,
                start,
                end,
            }
        })
        .collect();

    Ok(ranges)
}
