//! Error types shared by every sampling and reduction operation.

use thiserror::Error;

/// Boxed error a [`DataFeeder`](crate::parallel::DataFeeder) reports instead of an item.
pub type FeederError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by reservoirs, merges and the parallel reduction.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller supplied an argument outside the operation's domain
    /// (negative capacity, mismatched merge capacities, zero partitions, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A data feeder failed; the whole reduction is aborted.
    #[error("partition {partition} failed: {source}")]
    FeederFailure {
        partition: usize,
        #[source]
        source: FeederError,
    },

    /// A worker or reducer was cancelled while waiting on the queue or on its feeder.
    #[error("{role} interrupted while waiting")]
    Interrupted { role: String },

    /// An internal invariant did not hold.
    #[error("internal consistency failure: {0}")]
    Inconsistent(String),

    /// A worker or reducer thread panicked.
    #[error("{role} panicked")]
    Panicked { role: String },
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn interrupted(role: impl Into<String>) -> Self {
        Error::Interrupted { role: role.into() }
    }

    /// Returns true for errors caused by cancellation rather than by a root failure.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted { .. })
    }
}

/// Result type for sampling operations
pub type Result<T> = std::result::Result<T, Error>;
