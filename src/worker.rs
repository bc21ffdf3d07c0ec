//! Worker units: counting primes in one sub-range.
//!
//! The executor only talks to the [`RangeWorker`] trait. The production
//! implementation is [`TrialDivisionWorker`]; tests plug in workers that fail
//! or block on purpose.

use crate::error::Result;
use crate::types::SubRange;

/// Trait for counting primes in a sub-range
///
/// Implementations must be pure functions of the range: the executor may run
/// the same range more than once, and runs many ranges in parallel.
///
/// Calls are CPU bound; the executor runs them on the blocking thread pool.
pub trait RangeWorker: Send + Sync {
    /// Count primes in `range` (inclusive bounds)
    ///
    /// # Errors
    ///
    /// Any error marks the chunk task as failed, with the error's message as
    /// the task's failure info.
    fn count(&self, range: SubRange) -> Result<u64>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Counts primes by trial division with odd divisors up to `sqrt(x)`
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialDivisionWorker;

impl RangeWorker for TrialDivisionWorker {
    fn count(&self, range: SubRange) -> Result<u64> {
        Ok(count_primes_in_range(range.start, range.end))
    }

    fn name(&self) -> &'static str {
        "trial-division"
    }
}

/// Whether `x` is prime
pub fn is_prime(x: u64) -> bool {
    if x < 2 {
        return false;
    }
    if x == 2 {
        return true;
    }
    if x % 2 == 0 {
        return false;
    }
    let mut d = 3u64;
    // d <= x / d avoids overflowing d * d near u64::MAX
    while d <= x / d {
        if x % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Number of primes in `[start, end]`. Zero when `start > end`.
pub fn count_primes_in_range(start: u64, end: u64) -> u64 {
    if start > end {
        return 0;
    }
    (start..=end).filter(|&x| is_prime(x)).count() as u64
}
