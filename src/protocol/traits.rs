//! The framing contract between a byte stream and typed messages.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Framing violations. A session reacts by resetting the parser and
/// disconnecting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A frame announced a size beyond the configured bound.
    #[error("frame of {size} bytes exceeds the {max}-byte limit")]
    FrameTooLarge { size: usize, max: usize },

    /// The byte stream does not match the protocol's framing.
    #[error("malformed frame: {0}")]
    Malformed(&'static str),
}

/// A stateful parser/serialiser framing a byte stream into messages.
///
/// The session drives it: after every read it asks
/// [`message_size`](Protocol::message_size); whenever the answer `n` is
/// non-zero, the first `n` buffered bytes form one complete frame, which
/// is handed to [`decode`](Protocol::decode) and then consumed from the
/// buffer — exactly `n` bytes, no more.
///
/// `message_size` may keep internal state between calls (a parsed header,
/// for instance); [`reset`](Protocol::reset) clears that state at message
/// boundaries and after errors.
pub trait Protocol: Send + 'static {
    /// The application message type this protocol produces and consumes.
    type Message: Send + 'static;

    /// Size in bytes of the next complete message (header included), or
    /// zero if more bytes are needed. An error means the stream cannot be
    /// framed at all.
    fn message_size(&mut self, buf: &[u8]) -> Result<usize, ProtocolError>;

    /// Parse one complete frame, previously sized by `message_size`.
    fn decode(&mut self, frame: &[u8]) -> Result<Self::Message, ProtocolError>;

    /// Serialise a message, appending its wire form to `out`.
    fn encode(&self, message: &Self::Message, out: &mut Vec<u8>);

    /// Clear parser state.
    fn reset(&mut self);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::FrameTooLarge { size: 10, max: 4 };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains('4'));
        assert!(ProtocolError::Malformed("x").to_string().contains('x'));
    }
}
