//! Sequential reservoir sampling and the merge of partial samples.
//!
//! - [`Reservoir`]: Algorithm R over a single stream.
//! - [`SampleResult`]: immutable snapshot of a reservoir.
//! - [`SharedReservoir`]: lock-protected handle for sampling on one thread
//!   while snapshotting from another.
//! - [`merge`]: combine two snapshots into a sample of the concatenated stream.

pub mod handle;
pub mod merge;
pub mod reservoir;
pub mod result;

pub use handle::SharedReservoir;
pub use merge::merge;
pub use reservoir::Reservoir;
pub use result::SampleResult;
