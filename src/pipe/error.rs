//! Pipe error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors surfaced by the cross-shard pipe.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeError {
    /// The ring is at its ceiling and the consumer has not freed enough
    /// space. The caller decides between retrying and reporting.
    #[error("pipe full at ceiling capacity")]
    Full,

    /// A single bucket larger than the ring can ever hold.
    #[error("bucket of {bytes} bytes exceeds pipe ceiling of {ceiling} bytes")]
    Oversized { bytes: usize, ceiling: usize },
}

impl PipeError {
    /// Full pipes drain; oversized buckets never fit.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipeError::Full)
    }
}
