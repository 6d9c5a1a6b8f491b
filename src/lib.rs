//! Reservoir sampling for single and partitioned streams.
//!
//! - [`sampling`]: Algorithm R reservoirs, immutable snapshots, a
//!   thread-safe handle and the merge of two samples.
//! - [`parallel`]: per-partition workers feeding a concurrent pairwise
//!   reduction, plus a rayon fork/join sampler for in-memory slices.
//! - [`random`]: the random source abstraction and seedable adapters.
//! - [`config`]: sampler configuration.

pub mod config;
pub mod error;
pub mod parallel;
pub mod random;
pub mod sampling;

pub use config::{SamplerConfig, Scheduling};
pub use error::{Error, Result};
pub use parallel::{run_parallel_sample, DataFeeder, Feed, ParallelSampler};
pub use random::{ChaChaSource, RandomSource};
pub use sampling::{merge, Reservoir, SampleResult, SharedReservoir};
