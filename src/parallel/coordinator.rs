//! The concurrent reduction of partial samples.
//!
//! `N` workers publish their partition samples into a bounded queue of
//! capacity `N`. `N - 1` reducers each run exactly one transaction: take two
//! results, [`merge`] them, put the merged result back. Each transaction
//! shrinks the queue by one, so after all of them the queue holds the final
//! sample. Which results meet in which transaction depends only on arrival
//! order, giving a dynamic reduction tree with no coordination beyond the
//! queue's blocking take and put.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use log::{info, trace, warn};

use crate::config::{SamplerConfig, Scheduling};
use crate::error::{Error, Result};
use crate::parallel::feeder::DataFeeder;
use crate::parallel::queue::{Role, SampleQueue};
use crate::parallel::worker::WorkerSampler;
use crate::parallel::CancelToken;
use crate::random::{RandomSource, SourceFactory};
use crate::sampling::{merge, SampleResult};

/// Progress of a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Partial results are arriving; no reducer has started.
    Collecting,
    /// At least one reducer transaction has started.
    Reducing,
    /// Every partition is published and all `N - 1` transactions completed.
    Done,
}

/// Owns the shared queue and runs the reducer transactions.
///
/// [`ParallelSampler`](crate::parallel::ParallelSampler) drives a
/// coordinator end to end; it can also be driven by hand with
/// [`publish`](Self::publish), [`reduce_once`](Self::reduce_once) and
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct ReductionCoordinator<T> {
    partitions: usize,
    capacity: usize,
    queue: SampleQueue<T>,
    cancel: CancelToken,
    published: AtomicUsize,
    reducers_started: AtomicUsize,
    reductions_done: AtomicUsize,
}

impl<T> ReductionCoordinator<T> {
    /// Coordinator for `partitions` results of capacity `capacity`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `partitions` is zero.
    pub fn new(partitions: usize, capacity: usize, cancel: CancelToken) -> Result<Self> {
        if partitions == 0 {
            return Err(Error::invalid("at least one partition is required"));
        }
        Ok(Self {
            partitions,
            capacity,
            queue: SampleQueue::new(partitions),
            cancel,
            published: AtomicUsize::new(0),
            reducers_started: AtomicUsize::new(0),
            reductions_done: AtomicUsize::new(0),
        })
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of reducer transactions a complete reduction runs.
    pub fn reductions(&self) -> usize {
        self.partitions - 1
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn phase(&self) -> Phase {
        let done = self.reductions_done.load(Ordering::Acquire);
        let published = self.published.load(Ordering::Acquire);
        if done == self.reductions() && published == self.partitions {
            Phase::Done
        } else if self.reducers_started.load(Ordering::Acquire) > 0 {
            Phase::Reducing
        } else {
            Phase::Collecting
        }
    }

    /// Publish one partition's result into the queue.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the result's capacity differs from the
    /// coordinator's or all partitions were already published.
    pub fn publish(&self, result: SampleResult<T>) -> Result<()> {
        if result.capacity() != self.capacity {
            return Err(Error::invalid(format!(
                "published capacity {} does not match {}",
                result.capacity(),
                self.capacity
            )));
        }
        let partition = self.published.load(Ordering::Acquire);
        self.publish_as(result, Role::Worker(partition))
    }

    pub(crate) fn publish_as(&self, result: SampleResult<T>, role: Role) -> Result<()> {
        let claimed = self
            .published
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                (p < self.partitions).then_some(p + 1)
            });
        if claimed.is_err() {
            return Err(Error::invalid(format!(
                "all {} partitions already published",
                self.partitions
            )));
        }
        self.queue.put(result, &self.cancel, role).inspect_err(|_| {
            self.published.fetch_sub(1, Ordering::AcqRel);
        })
    }

    /// Run one reducer transaction: take two results, merge them, put one back.
    ///
    /// Blocks until two results are available. If cancelled while holding
    /// only one result, that result is put back before returning.
    pub fn reduce_once<R>(&self, reducer: usize, rng: &mut R) -> Result<()>
    where
        R: RandomSource + ?Sized,
    {
        let role = Role::Reducer(reducer);
        self.reducers_started.fetch_add(1, Ordering::AcqRel);

        let first = self.queue.take(&self.cancel, role)?;
        let second = match self.queue.take(&self.cancel, role) {
            Ok(second) => second,
            Err(e) => {
                match self.queue.restore(first) {
                    Ok(()) => warn!("{role} interrupted, restored its item"),
                    Err(restore) => warn!("{role} interrupted and lost its item: {restore}"),
                }
                return Err(e);
            }
        };

        let (left, right) = (first.total(), second.total());
        let merged = merge(first, second, rng)?;
        trace!("{role} merged totals {left} + {right}");
        self.queue.put(merged, &self.cancel, role)?;
        self.reductions_done.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Take the final result once the reduction is complete.
    ///
    /// # Errors
    ///
    /// [`Error::Inconsistent`] unless the reduction reached [`Phase::Done`]
    /// with exactly one result left in the queue.
    pub fn finish(&self) -> Result<SampleResult<T>> {
        if self.phase() != Phase::Done || self.queue.len() != 1 {
            return Err(Error::Inconsistent(format!(
                "reduction not complete: {} of {} published, {} of {} merges, {} queued",
                self.published.load(Ordering::Acquire),
                self.partitions,
                self.reductions_done.load(Ordering::Acquire),
                self.reductions(),
                self.queue.len()
            )));
        }
        let result = self
            .queue
            .try_take()
            .ok_or_else(|| Error::Inconsistent("final result vanished".to_string()))?;
        info!(
            "reduction done: {} partitions, total {}, {} samples",
            self.partitions,
            result.total(),
            result.len()
        );
        Ok(result)
    }
}

impl<T: Send> ReductionCoordinator<T> {
    /// Sample every feeder and reduce the partial results to one.
    ///
    /// Any failure cancels the coordinator's token so that sibling threads
    /// unwind; the root failure is returned in preference to the
    /// interruptions it caused.
    pub(crate) fn drive<F, S>(
        &self,
        feeders: &mut [F],
        sources: &S,
        config: &SamplerConfig,
    ) -> Result<SampleResult<T>>
    where
        F: DataFeeder<T> + Send,
        S: SourceFactory,
    {
        if feeders.len() != self.partitions {
            return Err(Error::invalid(format!(
                "{} feeders for {} partitions",
                feeders.len(),
                self.partitions
            )));
        }
        info!(
            "sampling {} partitions into capacity {} ({:?})",
            self.partitions, self.capacity, config.scheduling
        );

        let outcome = match config.scheduling {
            Scheduling::Threaded => self.drive_threaded(feeders, sources, config),
            Scheduling::Sequential => self.drive_sequential(feeders, sources, config),
        };
        if let Err(e) = outcome {
            warn!("sampling aborted: {e}");
            self.cancel.cancel();
            return Err(e);
        }
        self.finish()
    }

    fn drive_threaded<F, S>(&self, feeders: &mut [F], sources: &S, config: &SamplerConfig) -> Result<()>
    where
        F: DataFeeder<T> + Send,
        S: SourceFactory,
    {
        let n = self.partitions;
        let outcomes: Vec<Result<()>> = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(2 * n - 1);

            for (partition, feeder) in feeders.iter_mut().enumerate() {
                let rng = sources.source(partition as u64);
                let handle = scope.spawn(move || {
                    let _guard = self.cancel.cancel_on_panic();
                    let outcome = self.worker(partition, feeder, rng, config).run(self);
                    self.cancel_on_error(outcome)
                });
                handles.push((Role::Worker(partition), handle));
            }

            for reducer in 0..n - 1 {
                let mut rng = sources.source((n + reducer) as u64);
                let handle = scope.spawn(move || {
                    let _guard = self.cancel.cancel_on_panic();
                    let outcome = self.reduce_once(reducer, &mut rng);
                    self.cancel_on_error(outcome)
                });
                handles.push((Role::Reducer(reducer), handle));
            }

            handles
                .into_iter()
                .map(|(role, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Error::Panicked {
                            role: role.to_string(),
                        })
                    })
                })
                .collect()
        });

        root_failure(outcomes)
    }

    fn drive_sequential<F, S>(&self, feeders: &mut [F], sources: &S, config: &SamplerConfig) -> Result<()>
    where
        F: DataFeeder<T>,
        S: SourceFactory,
    {
        let n = self.partitions;
        for (partition, feeder) in feeders.iter_mut().enumerate() {
            self.worker(partition, feeder, sources.source(partition as u64), config)
                .run(self)?;
        }
        for reducer in 0..n - 1 {
            self.reduce_once(reducer, &mut sources.source((n + reducer) as u64))?;
        }
        Ok(())
    }

    fn worker<'f, F, R>(
        &self,
        partition: usize,
        feeder: &'f mut F,
        rng: R,
        config: &SamplerConfig,
    ) -> WorkerSampler<'f, T, F, R>
    where
        F: DataFeeder<T>,
        R: RandomSource,
    {
        WorkerSampler::new(partition, self.capacity, feeder, rng)
            .with_backoff(config.pending_backoff, config.max_backoff)
    }

    fn cancel_on_error(&self, outcome: Result<()>) -> Result<()> {
        if outcome.is_err() {
            self.cancel.cancel();
        }
        outcome
    }
}

/// The first error that is not a mere interruption, else the first interruption.
fn root_failure(outcomes: Vec<Result<()>>) -> Result<()> {
    let mut interrupted = None;
    for outcome in outcomes {
        match outcome {
            Ok(()) => {}
            Err(e) if e.is_interrupted() => {
                interrupted.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }
    interrupted.map_or(Ok(()), Err)
}
