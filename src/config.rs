//! Configuration for the parallel sampler.

use std::time::Duration;

use crate::error::{Error, Result};

/// How workers and reducers are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheduling {
    /// One OS thread per worker and per reducer.
    #[default]
    Threaded,
    /// Workers, then reducers, one after another on the calling thread.
    ///
    /// Runs the same queue transactions as `Threaded`; useful for
    /// deterministic tests. Feeders must not depend on each other.
    Sequential,
}

/// Configuration options for [`ParallelSampler`](crate::parallel::ParallelSampler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Target sample size `K`
    pub capacity: usize,
    /// Base seed for the per-thread random sources; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Thread scheduling
    pub scheduling: Scheduling,
    /// First sleep after a feeder reports `Pending`
    pub pending_backoff: Duration,
    /// Upper bound for the doubling `Pending` backoff
    pub max_backoff: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            seed: None,
            scheduling: Scheduling::Threaded,
            pending_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(50),
        }
    }
}

impl SamplerConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.pending_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Check the backoff bounds.
    pub fn validate(&self) -> Result<()> {
        if self.max_backoff.is_zero() {
            return Err(Error::invalid("max_backoff must be positive"));
        }
        if self.pending_backoff > self.max_backoff {
            return Err(Error::invalid(format!(
                "pending_backoff {:?} exceeds max_backoff {:?}",
                self.pending_backoff, self.max_backoff
            )));
        }
        Ok(())
    }
}
