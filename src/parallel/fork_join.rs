//! Fork/join sampling of in-memory data with rayon.
//!
//! The slice is cut into chunks, each chunk is sampled by its own reservoir
//! on the rayon pool, and the partial samples are combined with [`merge`]
//! in a balanced tree of `rayon::join` calls. Unlike the queue-based
//! reduction this never blocks, so it is safe on a pool smaller than the
//! chunk count.

use rayon::prelude::*;

use crate::config::SamplerConfig;
use crate::error::{Error, Result};
use crate::random::{SeedSequence, SourceFactory};
use crate::sampling::{merge, Reservoir, SampleResult};

/// Uniformly sample `capacity` elements of `data`, `chunk_len` elements per task.
///
/// # Example
///
/// ```rust
/// use parallel_reservoir::parallel::par_sample_slice;
///
/// let data: Vec<u32> = (0..10_000).collect();
/// let sample = par_sample_slice(&data, 25, 512).unwrap();
/// assert_eq!(sample.total(), 10_000);
/// assert_eq!(sample.len(), 25);
/// ```
pub fn par_sample_slice<T>(data: &[T], capacity: usize, chunk_len: usize) -> Result<SampleResult<T>>
where
    T: Clone + Send + Sync,
{
    par_sample_slice_with(data, chunk_len, &SamplerConfig::new(capacity))
}

/// [`par_sample_slice`] taking capacity and seed from `config`.
///
/// Chunk `i` is sampled with stream `i` of the seed. The partial samples are
/// merged in a fixed balanced tree; the merge that joins the halves split at
/// chunk `m` uses stream `chunks + m - 1`. A seeded call is therefore
/// reproducible regardless of how rayon schedules the work.
pub fn par_sample_slice_with<T>(data: &[T], chunk_len: usize, config: &SamplerConfig) -> Result<SampleResult<T>>
where
    T: Clone + Send + Sync,
{
    if chunk_len == 0 {
        return Err(Error::invalid("chunk length must be positive"));
    }
    let capacity = config.capacity;
    let seeds = SeedSequence::from_seed(config.seed);

    let parts: Vec<SampleResult<T>> = data
        .par_chunks(chunk_len)
        .enumerate()
        .map(|(i, chunk)| {
            let mut rng = seeds.source(i as u64);
            let mut reservoir = Reservoir::with_capacity(capacity);
            reservoir.ingest_from(chunk.iter().cloned(), &mut rng);
            reservoir.into_result()
        })
        .collect();

    if parts.is_empty() {
        return Ok(SampleResult::empty(capacity));
    }
    let chunks = parts.len();
    merge_tree(parts, 0, chunks, &seeds)
}

/// Merge `parts`, which start at chunk index `first`, into one sample.
fn merge_tree<T: Send>(
    mut parts: Vec<SampleResult<T>>,
    first: usize,
    chunks: usize,
    seeds: &SeedSequence,
) -> Result<SampleResult<T>> {
    if parts.len() <= 1 {
        return parts
            .pop()
            .ok_or_else(|| Error::Inconsistent("empty merge subtree".to_string()));
    }
    let half = parts.len() / 2;
    let right = parts.split_off(half);
    let split = first + half;

    let (left, right) = rayon::join(
        || merge_tree(parts, first, chunks, seeds),
        || merge_tree(right, split, chunks, seeds),
    );
    // split points are distinct across the tree, so every merge gets its own stream
    let mut rng = seeds.source((chunks + split - 1) as u64);
    merge(left?, right?, &mut rng)
}
