//! Stream partitions.
//!
//! A [`DataFeeder`] yields the elements of one partition, then signals
//! [`Feed::EndOfStream`]. Feeders are always finite; a feeder with nothing
//! ready yet answers [`Feed::Pending`] and the worker backs off.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, FeederError, Result};

/// What a feeder hands out on each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed<T> {
    /// The next stream element
    Item(T),
    /// The partition is exhausted; the feeder will not be called again
    EndOfStream,
    /// Nothing available right now; ask again later
    Pending,
}

/// Producer of one stream partition.
pub trait DataFeeder<T> {
    /// Produce the next element, or report that the partition is finished.
    ///
    /// Errors abort the whole sampling run.
    fn next_item(&mut self) -> std::result::Result<Feed<T>, FeederError>;
}

impl<T, F: DataFeeder<T> + ?Sized> DataFeeder<T> for &mut F {
    fn next_item(&mut self) -> std::result::Result<Feed<T>, FeederError> {
        (**self).next_item()
    }
}

impl<T, F: DataFeeder<T> + ?Sized> DataFeeder<T> for Box<F> {
    fn next_item(&mut self) -> std::result::Result<Feed<T>, FeederError> {
        (**self).next_item()
    }
}

/// Feeds the elements of an iterator.
#[derive(Debug, Clone)]
pub struct IterFeeder<I> {
    iter: std::iter::Fuse<I>,
}

impl<I: Iterator> IterFeeder<I> {
    pub fn new<S>(source: S) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: source.into_iter().fuse(),
        }
    }
}

impl<I: Iterator> DataFeeder<I::Item> for IterFeeder<I> {
    fn next_item(&mut self) -> std::result::Result<Feed<I::Item>, FeederError> {
        Ok(self.iter.next().map_or(Feed::EndOfStream, Feed::Item))
    }
}

/// Feeds an iterator of fallible reads, e.g. records parsed from a file.
///
/// The first `Err` is reported as a feeder failure.
#[derive(Debug, Clone)]
pub struct TryIterFeeder<I> {
    iter: std::iter::Fuse<I>,
}

impl<I: Iterator> TryIterFeeder<I> {
    pub fn new<S>(source: S) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: source.into_iter().fuse(),
        }
    }
}

impl<I, T, E> DataFeeder<T> for TryIterFeeder<I>
where
    I: Iterator<Item = std::result::Result<T, E>>,
    E: Into<FeederError>,
{
    fn next_item(&mut self) -> std::result::Result<Feed<T>, FeederError> {
        match self.iter.next() {
            Some(Ok(item)) => Ok(Feed::Item(item)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(Feed::EndOfStream),
        }
    }
}

/// Synthetic partition of random `i32` values, used by the benchmarks.
#[derive(Debug, Clone)]
pub struct RandomDataFeeder {
    total: u64,
    fed: u64,
    rng: ChaCha8Rng,
}

impl RandomDataFeeder {
    /// A partition of exactly `total` random values.
    pub fn new(total: u64, seed: u64) -> Self {
        Self {
            total,
            fed: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// A partition whose length is drawn uniformly from `[min, max]`.
    pub fn with_random_length(min: u64, max: u64, seed: u64) -> Result<Self> {
        if min > max {
            return Err(Error::invalid(format!(
                "partition length range is empty: {min}..={max}"
            )));
        }
        let mut feeder = Self::new(0, seed);
        feeder.total = feeder.rng.gen_range(min..=max);
        Ok(feeder)
    }

    /// Number of values this feeder produces in total
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of values still to come
    pub fn remaining(&self) -> u64 {
        self.total - self.fed
    }
}

impl DataFeeder<i32> for RandomDataFeeder {
    fn next_item(&mut self) -> std::result::Result<Feed<i32>, FeederError> {
        if self.fed >= self.total {
            return Ok(Feed::EndOfStream);
        }
        self.fed += 1;
        Ok(Feed::Item(self.rng.gen()))
    }
}
