use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::parallel::feeder::{DataFeeder, Feed};
use crate::parallel::queue::Role;
use crate::parallel::{CancelToken, ReductionCoordinator};
use crate::random::RandomSource;
use crate::sampling::{Reservoir, SampleResult};

/// Drives one [`Reservoir`] from one borrowed [`DataFeeder`] until the
/// partition is exhausted.
///
/// The worker owns its reservoir and random source; the feeder stays owned
/// by the caller. Nothing is published if the feeder fails.
#[derive(Debug)]
pub struct WorkerSampler<'f, T, F: ?Sized, R> {
    partition: usize,
    reservoir: Reservoir<T>,
    feeder: &'f mut F,
    rng: R,
    pending_backoff: Duration,
    max_backoff: Duration,
}

impl<'f, T, F, R> WorkerSampler<'f, T, F, R>
where
    F: DataFeeder<T> + ?Sized,
    R: RandomSource,
{
    pub fn new(partition: usize, capacity: usize, feeder: &'f mut F, rng: R) -> Self {
        Self {
            partition,
            reservoir: Reservoir::with_capacity(capacity),
            feeder,
            rng,
            pending_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(50),
        }
    }

    /// Sleep bounds used while the feeder reports [`Feed::Pending`].
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.pending_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    /// Consume the feeder to its end and return the partition's sample.
    ///
    /// # Errors
    ///
    /// - [`Error::FeederFailure`] if the feeder reports an error.
    /// - [`Error::Interrupted`] if `cancel` fires first.
    pub fn sample(mut self, cancel: &CancelToken) -> Result<SampleResult<T>> {
        let role = Role::Worker(self.partition);
        let mut delay = self.pending_backoff;
        debug!("{role} started");

        loop {
            if cancel.is_cancelled() {
                return Err(Error::interrupted(role.to_string()));
            }
            let feed = self.feeder.next_item().map_err(|source| {
                warn!("{role} feeder failed: {source}");
                Error::FeederFailure {
                    partition: self.partition,
                    source,
                }
            })?;

            match feed {
                Feed::Item(element) => {
                    self.reservoir.try_sample(element, &mut self.rng);
                    delay = self.pending_backoff;
                }
                Feed::EndOfStream => break,
                Feed::Pending => {
                    // the signal channel only ever disconnects, so any
                    // outcome other than a timeout means cancellation
                    match cancel.signal().recv_timeout(delay) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => return Err(Error::interrupted(role.to_string())),
                    }
                    delay = (delay * 2).min(self.max_backoff);
                }
            }
        }

        debug!(
            "{role} finished: total {}, kept {}",
            self.reservoir.total(),
            self.reservoir.len()
        );
        Ok(self.reservoir.into_result())
    }

    /// Sample the partition and publish the result to `coordinator`.
    ///
    /// Uses the coordinator's cancel token. Nothing is published on error.
    pub fn run(self, coordinator: &ReductionCoordinator<T>) -> Result<()> {
        let role = Role::Worker(self.partition);
        let result = self.sample(coordinator.cancel_token())?;
        coordinator.publish_as(result, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeederError;
    use crate::parallel::feeder::IterFeeder;
    use crate::random::{ChaChaSource, ScriptedSource};

    /// Yields `Pending` a fixed number of times before each item.
    struct Stuttering {
        items: std::vec::IntoIter<u32>,
        stalls: usize,
        left: usize,
    }

    impl DataFeeder<u32> for Stuttering {
        fn next_item(&mut self) -> std::result::Result<Feed<u32>, FeederError> {
            if self.left > 0 {
                self.left -= 1;
                return Ok(Feed::Pending);
            }
            self.left = self.stalls;
            Ok(self.items.next().map_or(Feed::EndOfStream, Feed::Item))
        }
    }

    struct Broken;

    impl DataFeeder<u32> for Broken {
        fn next_item(&mut self) -> std::result::Result<Feed<u32>, FeederError> {
            Err("socket closed".into())
        }
    }

    #[test]
    fn test_sample_whole_partition() {
        let mut feeder = IterFeeder::new(0..1000u32);
        let worker = WorkerSampler::new(2, 10, &mut feeder, ChaChaSource::seeded(1));
        assert_eq!(worker.partition(), 2);
        let result = worker.sample(&CancelToken::new()).unwrap();
        assert_eq!(result.total(), 1000);
        assert_eq!(result.len(), 10);
    }

    #[test]
    fn test_scripted_worker() {
        let mut feeder = IterFeeder::new(['A', 'B', 'C']);
        let rng = ScriptedSource::new([true], [0]);
        let result = WorkerSampler::new(0, 2, &mut feeder, rng)
            .sample(&CancelToken::new())
            .unwrap();
        assert_eq!(result.samples(), &['C', 'B']);
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn test_pending_is_retried() {
        let mut feeder = Stuttering {
            items: vec![1, 2, 3].into_iter(),
            stalls: 2,
            left: 2,
        };
        let result = WorkerSampler::new(0, 5, &mut feeder, ChaChaSource::seeded(3))
            .with_backoff(Duration::from_micros(100), Duration::from_millis(1))
            .sample(&CancelToken::new())
            .unwrap();
        assert_eq!(result.samples(), &[1, 2, 3]);
    }

    #[test]
    fn test_feeder_failure() {
        let mut feeder = Broken;
        let err = WorkerSampler::new(7, 5, &mut feeder, ChaChaSource::seeded(3))
            .sample(&CancelToken::new())
            .unwrap_err();
        match err {
            Error::FeederFailure { partition, source } => {
                assert_eq!(partition, 7);
                assert_eq!(source.to_string(), "socket closed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut feeder = IterFeeder::new(0..10u32);
        let err = WorkerSampler::new(1, 5, &mut feeder, ChaChaSource::seeded(3))
            .sample(&cancel)
            .unwrap_err();
        assert!(err.is_interrupted());
    }

    #[test]
    fn test_run_publishes() {
        let coordinator = ReductionCoordinator::new(1, 8, CancelToken::new()).unwrap();
        let mut feeder = IterFeeder::new(0..4u32);
        WorkerSampler::new(0, 8, &mut feeder, ChaChaSource::seeded(3))
            .run(&coordinator)
            .unwrap();
        let published = coordinator.finish().unwrap();
        assert_eq!(published.samples(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_failed_worker_publishes_nothing() {
        let coordinator = ReductionCoordinator::<u32>::new(1, 8, CancelToken::new()).unwrap();
        let mut feeder = Broken;
        let err = WorkerSampler::new(0, 8, &mut feeder, ChaChaSource::seeded(3))
            .run(&coordinator)
            .unwrap_err();
        assert!(matches!(err, Error::FeederFailure { partition: 0, .. }));
        assert!(coordinator.finish().is_err());
    }
}
