//! Merging independently sampled reservoirs.
//!
//! Given uniform samples `x` and `y` of two disjoint streams, [`merge`]
//! produces a uniform sample of their concatenation:
//!
//! 1. Each of the `K` output slots is assigned to `x` with probability
//!    `x.total / (x.total + y.total)`, otherwise to `y`. Slots are weighted by
//!    the true stream totals, not by how many samples each side kept.
//! 2. Slot counts are capped at what each side actually holds; a shortfall
//!    on one side moves to the other, up to that side's own holdings.
//! 3. Each side contributes a uniform subset of its samples of the assigned
//!    size, drawn by feeding its samples through a scratch [`Reservoir`].
//!
//! The merge is commutative and associative in distribution, so any pairing
//! order over a set of partial results gives a sample equivalent to running
//! the whole stream through one reservoir.

use log::trace;

use crate::error::{Error, Result};
use crate::random::RandomSource;
use crate::sampling::result::expected_len;
use crate::sampling::{Reservoir, SampleResult};

/// Merge two samples of the same capacity into a sample of the combined stream.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] if the capacities differ.
/// - [`Error::Inconsistent`] if the totals overflow or the operands do not
///   hold enough samples to fill `min(K, x.total + y.total)` slots.
///
/// # Example
///
/// ```rust
/// use parallel_reservoir::random::ChaChaSource;
/// use parallel_reservoir::sampling::{merge, Reservoir};
///
/// let mut rng = ChaChaSource::seeded(1);
/// let mut left = Reservoir::with_capacity(4);
/// let mut right = Reservoir::with_capacity(4);
/// left.ingest_from(0..100, &mut rng);
/// right.ingest_from(100..130, &mut rng);
///
/// let merged = merge(left.into_result(), right.into_result(), &mut rng).unwrap();
/// assert_eq!(merged.total(), 130);
/// assert_eq!(merged.len(), 4);
/// ```
pub fn merge<T, R>(x: SampleResult<T>, y: SampleResult<T>, rng: &mut R) -> Result<SampleResult<T>>
where
    R: RandomSource + ?Sized,
{
    if x.capacity() != y.capacity() {
        return Err(Error::invalid(format!(
            "cannot merge samples of capacity {} and {}",
            x.capacity(),
            y.capacity()
        )));
    }
    let capacity = x.capacity();
    let total = x.total().checked_add(y.total()).ok_or_else(|| {
        Error::Inconsistent(format!(
            "combined total overflows: {} + {}",
            x.total(),
            y.total()
        ))
    })?;

    if total == 0 {
        return Ok(SampleResult::empty(capacity));
    }

    let (from_x, from_y) = split_slots(capacity, x.total(), total, rng);
    let (take_x, take_y) = cap_to_available(from_x, from_y, x.len(), y.len());

    let target = expected_len(capacity, total);
    if take_x + take_y != target {
        return Err(Error::Inconsistent(format!(
            "samples on hand ({} + {}) cannot fill {} slots for total {}",
            x.len(),
            y.len(),
            target,
            total
        )));
    }

    trace!(
        "merging totals {} + {}: {} slots from left, {} from right",
        x.total(),
        y.total(),
        take_x,
        take_y
    );

    let mut merged = subsample(x, take_x, rng);
    merged.extend(subsample(y, take_y, rng));

    Ok(SampleResult::from_parts_unchecked(capacity, total, merged))
}

/// Assign each of `capacity` slots to the left side with probability
/// `left_total / total`. Returns the left and right slot counts.
fn split_slots<R>(capacity: usize, left_total: u64, total: u64, rng: &mut R) -> (usize, usize)
where
    R: RandomSource + ?Sized,
{
    let p_left = left_total as f64 / total as f64;
    let left = (0..capacity).filter(|_| rng.flip(p_left)).count();
    (left, capacity - left)
}

/// Cap slot counts at each side's holdings, moving any shortfall to the other side.
fn cap_to_available(want_x: usize, want_y: usize, have_x: usize, have_y: usize) -> (usize, usize) {
    let take_x = want_x.min(have_x);
    let take_y = want_y.min(have_y);
    let short_x = want_x - take_x;
    let short_y = want_y - take_y;
    (
        (take_x + short_y).min(have_x),
        (take_y + short_x).min(have_y),
    )
}

/// Uniformly pick `count` of the result's samples without replacement.
fn subsample<T, R>(result: SampleResult<T>, count: usize, rng: &mut R) -> Vec<T>
where
    R: RandomSource + ?Sized,
{
    let mut scratch = Reservoir::with_capacity(count);
    scratch.ingest_from(result.into_samples(), rng);
    scratch.into_result().into_samples()
}
