use std::sync::{Arc, Mutex, MutexGuard};

use crate::random::RandomSource;
use crate::sampling::{Reservoir, SampleResult};

/// Thread-safe handle around a [`Reservoir`].
///
/// The sampling thread calls [`try_sample`](Self::try_sample) while any other
/// thread may take a [`snapshot`](Self::snapshot). Both operations hold the
/// lock only for one update or one copy, so a snapshot never sees `total`
/// advanced past `samples`. Fetch the next element *before* calling
/// `try_sample` so the lock is never held across a feeder call.
///
/// Cloning the handle shares the same reservoir.
#[derive(Debug)]
pub struct SharedReservoir<T> {
    inner: Arc<Mutex<Reservoir<T>>>,
}

impl<T> Clone for SharedReservoir<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedReservoir<T> {
    pub fn new(reservoir: Reservoir<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reservoir)),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(Reservoir::with_capacity(capacity))
    }

    /// Offer one element under the lock.
    pub fn try_sample<R>(&self, element: T, rng: &mut R) -> bool
    where
        R: RandomSource + ?Sized,
    {
        self.lock().try_sample(element, rng)
    }

    /// Copy the current state under the lock.
    pub fn snapshot(&self) -> SampleResult<T>
    where
        T: Clone,
    {
        self.lock().snapshot()
    }

    pub fn total(&self) -> u64 {
        self.lock().total()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Take the reservoir back if this is the last handle.
    pub fn try_unwrap(self) -> Result<Reservoir<T>, Self> {
        Arc::try_unwrap(self.inner)
            .map(|m| m.into_inner().unwrap_or_else(|e| e.into_inner()))
            .map_err(|inner| Self { inner })
    }

    // Only the random source can panic under the lock, and the reservoir
    // satisfies its length invariant at every point the source is called.
    fn lock(&self) -> MutexGuard<'_, Reservoir<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T> From<Reservoir<T>> for SharedReservoir<T> {
    fn from(reservoir: Reservoir<T>) -> Self {
        Self::new(reservoir)
    }
}
