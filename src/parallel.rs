//! Sampling a stream that is partitioned across concurrent producers.
//!
//! Each partition is sampled by a [`WorkerSampler`] on its own thread. The
//! partial samples meet in a [`ReductionCoordinator`], which merges them
//! pairwise until one sample of the whole stream remains.
//!
//! # Example
//!
//! ```rust
//! use parallel_reservoir::parallel::{run_parallel_sample, IterFeeder};
//!
//! let mut feeders = vec![
//!     IterFeeder::new(0..10_000u32),
//!     IterFeeder::new(10_000..12_000u32),
//!     IterFeeder::new(12_000..12_005u32),
//! ];
//! let sample = run_parallel_sample(&mut feeders, 50).unwrap();
//! assert_eq!(sample.total(), 12_005);
//! assert_eq!(sample.len(), 50);
//! ```

pub mod cancel;
pub mod coordinator;
pub mod feeder;
pub mod fork_join;
mod queue;
pub mod sampler;
pub mod worker;

pub use cancel::CancelToken;
pub use coordinator::{Phase, ReductionCoordinator};
pub use feeder::{DataFeeder, Feed, IterFeeder, RandomDataFeeder, TryIterFeeder};
pub use fork_join::{par_sample_slice, par_sample_slice_with};
pub use sampler::{run_parallel_sample, ParallelSampler};
pub use worker::WorkerSampler;
