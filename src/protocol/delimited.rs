//! Delimiter-terminated framing (newline-style text protocols).

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::traits::{Protocol, ProtocolError};

/// Frames terminated by a single delimiter byte, `\n` by default.
///
/// The delimiter is stripped on decode and appended on encode; messages
/// must not themselves contain it. An unterminated run longer than the
/// configured bound is a framing error.
pub struct Delimited {
    delimiter: u8,
    max_frame: usize,
}

impl Delimited {
    /// Newline-delimited frames with a 64 KiB bound.
    pub fn lines() -> Self {
        Self::new(b'\n', 64 * 1024)
    }

    pub fn new(delimiter: u8, max_frame: usize) -> Self {
        Self {
            delimiter,
            max_frame,
        }
    }
}

impl Protocol for Delimited {
    type Message = Vec<u8>;

    fn message_size(&mut self, buf: &[u8]) -> Result<usize, ProtocolError> {
        match buf.iter().position(|&b| b == self.delimiter) {
            Some(i) if i + 1 > self.max_frame => Err(ProtocolError::FrameTooLarge {
                size: i + 1,
                max: self.max_frame,
            }),
            Some(i) => Ok(i + 1),
            None if buf.len() > self.max_frame => Err(ProtocolError::FrameTooLarge {
                size: buf.len(),
                max: self.max_frame,
            }),
            None => Ok(0),
        }
    }

    fn decode(&mut self, frame: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        match frame.split_last() {
            Some((&last, body)) if last == self.delimiter => Ok(body.to_vec()),
            _ => Err(ProtocolError::Malformed("missing terminator")),
        }
    }

    fn encode(&self, message: &Vec<u8>, out: &mut Vec<u8>) {
        debug_assert!(
            !message.contains(&self.delimiter),
            "message contains the frame delimiter"
        );
        out.extend_from_slice(message);
        out.push(self.delimiter);
    }

    fn reset(&mut self) {}
}
