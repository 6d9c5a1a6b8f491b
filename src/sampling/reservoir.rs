//! Sequential reservoir sampling (Algorithm R).
//!
//! A [`Reservoir`] keeps a uniform random sample of at most `K` elements from
//! a stream of unknown length in a single pass:
//!
//! 1. The first `K` elements are always kept.
//! 2. Element `n > K` is kept with probability `K / n` and, when kept,
//!    overwrites a uniformly chosen slot.
//!
//! By induction every element seen so far is in the sample with probability
//! exactly `K / n`: the newcomer enters with probability `K / n`, and a
//! previous element survives with probability `(K / (n - 1)) * (1 - 1 / n)`.
//!
//! The reservoir is a plain single-owner value. Wrap it in a
//! [`SharedReservoir`](super::SharedReservoir) to snapshot it from another
//! thread while it is being fed.
//!
//! # Example
//!
//! ```rust
//! use parallel_reservoir::random::ChaChaSource;
//! use parallel_reservoir::sampling::Reservoir;
//!
//! let mut rng = ChaChaSource::seeded(11);
//! let mut reservoir = Reservoir::new(5).unwrap();
//! reservoir.ingest_from(0..1000, &mut rng);
//!
//! let result = reservoir.snapshot();
//! assert_eq!(result.total(), 1000);
//! assert_eq!(result.samples().len(), 5);
//! ```

use std::fmt::Display;

use crate::error::{Error, Result};
use crate::random::RandomSource;
use crate::sampling::SampleResult;

/// Fixed-capacity uniform sample over the elements fed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservoir<T> {
    capacity: usize,
    total: u64,
    samples: Vec<T>,
}

impl<T> Reservoir<T> {
    /// Create a reservoir keeping at most `capacity` elements.
    ///
    /// Accepts any integer type so that signed capacities coming from
    /// configuration or user input are checked rather than wrapped.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `capacity` is negative or does not fit in `usize`.
    pub fn new<C>(capacity: C) -> Result<Self>
    where
        C: TryInto<usize> + Copy + Display,
    {
        let capacity = capacity
            .try_into()
            .map_err(|_| Error::invalid(format!("capacity must be non-negative, got {capacity}")))?;
        Ok(Self::with_capacity(capacity))
    }

    /// Infallible constructor for an already-validated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            total: 0,
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Offer one stream element to the reservoir.
    ///
    /// Returns `true` if the element was kept. With a zero capacity nothing is
    /// ever kept, but the element is still counted.
    pub fn try_sample<R>(&mut self, element: T, rng: &mut R) -> bool
    where
        R: RandomSource + ?Sized,
    {
        if self.total < self.capacity as u64 {
            self.samples.push(element);
            self.total += 1;
            return true;
        }

        self.total += 1;
        if self.capacity == 0 {
            return false;
        }

        if rng.flip(self.capacity as f64 / self.total as f64) {
            let idx = rng.pick_index(self.capacity);
            self.samples[idx] = element;
            true
        } else {
            false
        }
    }

    /// Feed every element of a finite sequence, returning how many were kept.
    ///
    /// Feeding a list of `L` elements into a fresh reservoir of capacity `m`
    /// draws `min(m, L)` of them uniformly without replacement; when `m >= L`
    /// all of them are kept in their original order.
    pub fn ingest_from<I, R>(&mut self, elements: I, rng: &mut R) -> usize
    where
        I: IntoIterator<Item = T>,
        R: RandomSource + ?Sized,
    {
        let mut kept = 0;
        for element in elements {
            if self.try_sample(element, rng) {
                kept += 1;
            }
        }
        kept
    }

    /// Copy the current state into an immutable [`SampleResult`].
    pub fn snapshot(&self) -> SampleResult<T>
    where
        T: Clone,
    {
        SampleResult::from_parts_unchecked(self.capacity, self.total, self.samples.clone())
    }

    /// Consume the reservoir without copying its samples.
    pub fn into_result(self) -> SampleResult<T> {
        SampleResult::from_parts_unchecked(self.capacity, self.total, self.samples)
    }

    /// Maximum number of elements kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of elements offered so far
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The elements currently kept
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Probability that any given element seen so far is in the sample.
    pub fn inclusion_probability(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.capacity as f64 / self.total as f64).min(1.0)
        }
    }
}
