use crate::config::SamplerConfig;
use crate::error::Result;
use crate::parallel::feeder::DataFeeder;
use crate::parallel::{CancelToken, ReductionCoordinator};
use crate::random::{SeedSequence, SourceFactory};
use crate::sampling::SampleResult;

/// Samples a partitioned stream: one worker per feeder, then a concurrent
/// pairwise reduction of the partial samples.
///
/// # Example
///
/// ```rust
/// use parallel_reservoir::config::SamplerConfig;
/// use parallel_reservoir::parallel::{IterFeeder, ParallelSampler};
///
/// let mut feeders: Vec<_> = (0..4u64)
///     .map(|p| IterFeeder::new(p * 1000..(p + 1) * 1000))
///     .collect();
///
/// let sampler = ParallelSampler::new(SamplerConfig::new(10).with_seed(42));
/// let result = sampler.run(&mut feeders).unwrap();
/// assert_eq!(result.total(), 4000);
/// assert_eq!(result.len(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct ParallelSampler {
    config: SamplerConfig,
}

impl ParallelSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample all feeders to exhaustion and reduce to one result.
    ///
    /// Per-thread random sources come from the configured seed (or entropy).
    pub fn run<T, F>(&self, feeders: &mut [F]) -> Result<SampleResult<T>>
    where
        T: Send,
        F: DataFeeder<T> + Send,
    {
        self.run_with_cancel(feeders, &CancelToken::new())
    }

    /// Like [`run`](Self::run), stopping with
    /// [`Error::Interrupted`](crate::error::Error::Interrupted) once `cancel`
    /// fires. An internal failure also cancels `cancel`.
    pub fn run_with_cancel<T, F>(&self, feeders: &mut [F], cancel: &CancelToken) -> Result<SampleResult<T>>
    where
        T: Send,
        F: DataFeeder<T> + Send,
    {
        let sources = SeedSequence::from_seed(self.config.seed);
        self.run_with_sources(feeders, &sources, cancel)
    }

    /// Run with caller-provided random sources.
    ///
    /// Worker `i` uses `sources.source(i)`; reducer `j` uses
    /// `sources.source(N + j)`.
    pub fn run_with_sources<T, F, S>(
        &self,
        feeders: &mut [F],
        sources: &S,
        cancel: &CancelToken,
    ) -> Result<SampleResult<T>>
    where
        T: Send,
        F: DataFeeder<T> + Send,
        S: SourceFactory,
    {
        self.config.validate()?;
        let coordinator = ReductionCoordinator::new(feeders.len(), self.config.capacity, cancel.clone())?;
        coordinator.drive(feeders, sources, &self.config)
    }
}

/// Sample `feeders` in parallel into one sample of size `capacity`.
///
/// # Errors
///
/// - [`Error::InvalidArgument`](crate::error::Error::InvalidArgument) if `feeders` is empty.
/// - [`Error::FeederFailure`](crate::error::Error::FeederFailure) naming the
///   first partition that failed; partial results are discarded.
pub fn run_parallel_sample<T, F>(feeders: &mut [F], capacity: usize) -> Result<SampleResult<T>>
where
    T: Send,
    F: DataFeeder<T> + Send,
{
    ParallelSampler::new(SamplerConfig::new(capacity)).run(feeders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scheduling;
    use crate::error::Error;
    use crate::parallel::IterFeeder;
    use crate::random::ScriptedSource;

    #[test]
    fn test_run_parallel_sample() {
        let mut feeders: Vec<_> = (0..5u32).map(|p| IterFeeder::new(0..(p + 1) * 100)).collect();
        let result = run_parallel_sample(&mut feeders, 16).unwrap();
        assert_eq!(result.total(), 1500);
        assert_eq!(result.len(), 16);
        assert_eq!(result.capacity(), 16);
    }

    #[test]
    fn test_no_feeders() {
        let mut feeders: Vec<IterFeeder<std::ops::Range<u8>>> = Vec::new();
        let err = run_parallel_sample(&mut feeders, 4).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_scripted_sources_sequential() {
        // one partition, no reducers: the worker's result is the answer
        let mut feeders = vec![IterFeeder::new(['A', 'B', 'C'])];
        let sampler = ParallelSampler::new(SamplerConfig::new(2).with_scheduling(Scheduling::Sequential));
        let sources = |_stream: u64| ScriptedSource::new([true], [0]);
        let result = sampler
            .run_with_sources(&mut feeders, &sources, &CancelToken::new())
            .unwrap();
        assert_eq!(result.samples(), &['C', 'B']);
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn test_seeded_sequential_is_reproducible() {
        let sampler = ParallelSampler::new(
            SamplerConfig::new(8)
                .with_seed(5)
                .with_scheduling(Scheduling::Sequential),
        );
        let run = || {
            let mut feeders: Vec<_> = (0..4u32).map(|p| IterFeeder::new(p * 50..p * 50 + 50)).collect();
            sampler.run(&mut feeders).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SamplerConfig::new(3).with_backoff(
            std::time::Duration::from_secs(1),
            std::time::Duration::from_millis(1),
        );
        let mut feeders = vec![IterFeeder::new(0..3u8)];
        assert!(ParallelSampler::new(config).run(&mut feeders).is_err());
    }
}
