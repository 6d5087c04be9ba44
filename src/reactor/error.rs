//! Reactor error types.

// Layer 1: Standard library imports
use std::io;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors surfaced by the per-shard reactor.
///
/// Only [`ReactorError::Init`] is fatal: a shard without a kernel poller
/// cannot run, so the shard enters its error state and the runtime reports
/// it through `has_error`. Everything else degrades to per-watcher
/// `Disconnected` events.
#[derive(Error, Debug)]
pub enum ReactorError {
    /// The kernel readiness facility could not be created.
    #[error("failed to create kernel poller: {0}")]
    Init(#[source] io::Error),

    /// A poll wait failed for a reason other than interruption.
    #[error("kernel poll failed: {0}")]
    Poll(#[source] io::Error),

    /// Registering, re-arming, or deregistering a source failed.
    #[error("watcher registration failed: {0}")]
    Registration(#[source] io::Error),

    /// The token does not name a live watcher on this shard.
    #[error("unknown watcher token {0}")]
    UnknownToken(usize),
}

impl ReactorError {
    /// True for errors that leave the shard unable to run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReactorError::Init(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        let init = ReactorError::Init(io::Error::new(io::ErrorKind::Other, "x"));
        assert!(init.is_fatal());
        assert!(!ReactorError::UnknownToken(3).is_fatal());
    }

    #[test]
    fn test_display_carries_token() {
        assert!(ReactorError::UnknownToken(17).to_string().contains("17"));
    }
}
