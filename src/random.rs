//! Random sources for sampling.
//!
//! Every component that needs randomness receives an explicit [`RandomSource`]
//! rather than reaching for a shared global generator. Sources are cheap to
//! create, so each worker and reducer thread owns its own.
//!
//! - [`RngSource`] adapts any [`rand::Rng`].
//! - [`ChaChaSource`] is the seedable default (ChaCha8).
//! - [`SeedSequence`] hands out one independent ChaCha stream per thread.
//! - [`ScriptedSource`] replays fixed answers for deterministic tests.
//!
//! # Example
//!
//! ```rust
//! use parallel_reservoir::random::{ChaChaSource, RandomSource};
//!
//! let mut rng = ChaChaSource::seeded(7);
//! let idx = rng.pick_index(10);
//! assert!(idx < 10);
//! assert!(rng.flip(1.0));
//! assert!(!rng.flip(0.0));
//! ```

use rand::rngs::ThreadRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// The two primitives reservoir sampling needs from a random number generator.
pub trait RandomSource {
    /// Biased coin flip: returns true with probability `p`.
    ///
    /// `p >= 1.0` always succeeds, `p <= 0.0` never does.
    fn flip(&mut self, p: f64) -> bool;

    /// Uniform index in `[0, n)`. `n` must be positive.
    fn pick_index(&mut self, n: usize) -> usize;
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn flip(&mut self, p: f64) -> bool {
        (**self).flip(p)
    }

    fn pick_index(&mut self, n: usize) -> usize {
        (**self).pick_index(n)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for Box<S> {
    fn flip(&mut self, p: f64) -> bool {
        (**self).flip(p)
    }

    fn pick_index(&mut self, n: usize) -> usize {
        (**self).pick_index(n)
    }
}

/// Adapts a `rand` generator to [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn flip(&mut self, p: f64) -> bool {
        // gen::<f64>() is in [0, 1), so p = 1.0 always wins
        self.rng.gen::<f64>() < p
    }

    fn pick_index(&mut self, n: usize) -> usize {
        assert!(n > 0, "pick_index needs a non-empty range");
        self.rng.gen_range(0..n)
    }
}

/// Seedable ChaCha8-backed source.
pub type ChaChaSource = RngSource<ChaCha8Rng>;

impl ChaChaSource {
    /// Create a source with a fixed seed (for reproducibility)
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Create a source seeded from the operating system
    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_entropy())
    }

    /// Create a source on ChaCha stream `stream` of the generator seeded with `seed`.
    ///
    /// Distinct streams of the same seed never overlap.
    pub fn with_stream(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self::new(rng)
    }
}

/// Source backed by the thread-local generator; not seedable and not `Send`.
pub type ThreadRngSource = RngSource<ThreadRng>;

impl Default for ThreadRngSource {
    fn default() -> Self {
        Self::new(rand::thread_rng())
    }
}

/// Produces one independent [`RandomSource`] per worker or reducer thread.
pub trait SourceFactory: Sync {
    type Source: RandomSource + Send;

    /// Build the source for the thread identified by `stream`.
    fn source(&self, stream: u64) -> Self::Source;
}

impl<F, S> SourceFactory for F
where
    F: Fn(u64) -> S + Sync,
    S: RandomSource + Send,
{
    type Source = S;

    fn source(&self, stream: u64) -> S {
        self(stream)
    }
}

/// Derives ChaCha streams from a single base seed.
///
/// Thread `i` gets stream `i` of the generator seeded with `base`, so a run
/// with a fixed base seed is reproducible no matter how threads interleave
/// their random draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSequence {
    base: u64,
}

impl SeedSequence {
    pub fn new(base: u64) -> Self {
        Self { base }
    }

    /// Pick the base seed from the thread-local generator.
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().gen())
    }

    /// `Some(seed)` gives a fixed sequence, `None` a fresh random one.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::new)
    }

    pub fn base(&self) -> u64 {
        self.base
    }
}

impl SourceFactory for SeedSequence {
    type Source = ChaChaSource;

    fn source(&self, stream: u64) -> ChaChaSource {
        ChaChaSource::with_stream(self.base, stream)
    }
}

/// A [`RandomSource`] that replays scripted answers.
///
/// Flips and picks are consumed in order from independent queues. Once a
/// queue is exhausted, `flip` answers `false` and `pick_index` answers `0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    flips: VecDeque<bool>,
    picks: VecDeque<usize>,
}

impl ScriptedSource {
    pub fn new(
        flips: impl IntoIterator<Item = bool>,
        picks: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            flips: flips.into_iter().collect(),
            picks: picks.into_iter().collect(),
        }
    }

    /// Remaining scripted flips
    pub fn flips_left(&self) -> usize {
        self.flips.len()
    }

    /// Remaining scripted picks
    pub fn picks_left(&self) -> usize {
        self.picks.len()
    }
}

impl RandomSource for ScriptedSource {
    fn flip(&mut self, _p: f64) -> bool {
        self.flips.pop_front().unwrap_or(false)
    }

    fn pick_index(&mut self, n: usize) -> usize {
        let idx = self.picks.pop_front().unwrap_or(0);
        assert!(idx < n, "scripted index {idx} out of range 0..{n}");
        idx
    }
}
