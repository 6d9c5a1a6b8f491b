use crate::error::{Error, Result};

/// Immutable snapshot of a reservoir: its capacity, how many stream elements
/// it has seen, and the elements it kept.
///
/// `samples().len() == min(total, capacity)` always holds. When
/// `total >= capacity` every element seen had probability `capacity / total`
/// of being kept, and the order of `samples` carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleResult<T> {
    capacity: usize,
    total: u64,
    samples: Vec<T>,
}

impl<T> SampleResult<T> {
    /// The result of sampling an empty stream.
    pub fn empty(capacity: usize) -> Self {
        Self {
            capacity,
            total: 0,
            samples: Vec::new(),
        }
    }

    /// Build a result from its parts, checking the length invariant.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `samples.len() != min(total, capacity)`.
    pub fn from_parts(capacity: usize, total: u64, samples: Vec<T>) -> Result<Self> {
        let expected = expected_len(capacity, total);
        if samples.len() != expected {
            return Err(Error::invalid(format!(
                "{} samples for total {} and capacity {} (expected {})",
                samples.len(),
                total,
                capacity,
                expected
            )));
        }
        Ok(Self {
            capacity,
            total,
            samples,
        })
    }

    /// Constructor for callers that already maintain the invariant.
    pub(crate) fn from_parts_unchecked(capacity: usize, total: u64, samples: Vec<T>) -> Self {
        Self {
            capacity,
            total,
            samples,
        }
    }

    /// Target sample size `K`
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stream elements this result represents
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The sampled elements
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Consume the result and return the sampled elements
    pub fn into_samples(self) -> Vec<T> {
        self.samples
    }
}

/// `min(total, capacity)` without overflowing on 32-bit targets.
pub(crate) fn expected_len(capacity: usize, total: u64) -> usize {
    usize::try_from(total).map_or(capacity, |t| t.min(capacity))
}
