//! Transport error types.

// Layer 1: Standard library imports
use std::io;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::uri::UriError;

/// Errors surfaced while binding, connecting, or transforming byte
/// streams. Once a session is established, failures travel as
/// `Disconnected` events instead.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The endpoint string did not parse.
    #[error(transparent)]
    Uri(#[from] UriError),

    /// Host resolution produced no usable address.
    #[error("could not resolve {0}")]
    Resolve(String),

    /// Binding a listener or datagram socket failed.
    #[error("bind failed: {0}")]
    Bind(#[source] io::Error),

    /// Starting an asynchronous connect failed outright.
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    /// The connector actor could not be constructed.
    #[error("connector spawn failed: {0}")]
    Spawn(String),

    /// A byte-stream transform rejected its input.
    #[error("transform failed: {0}")]
    Transform(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_error_converts() {
        let err: TransportError = UriError::MissingScheme.into();
        assert!(matches!(err, TransportError::Uri(_)));
    }
}
