//! Length-prefixed framing: u32 big-endian payload length, then payload.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::traits::{Protocol, ProtocolError};

/// Default maximum payload size.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

const PREFIX: usize = 4;

/// `u32` big-endian length prefix followed by that many payload bytes.
///
/// Messages are raw byte vectors; applications layer their own
/// serialisation on top.
///
/// # Example
/// ```rust
/// use coreactor::protocol::{LengthPrefix, Protocol};
///
/// let mut proto = LengthPrefix::new();
/// let mut wire = Vec::new();
/// proto.encode(&b"hi".to_vec(), &mut wire);
/// assert_eq!(wire, [0, 0, 0, 2, b'h', b'i']);
///
/// let size = proto.message_size(&wire).unwrap();
/// assert_eq!(size, 6);
/// assert_eq!(proto.decode(&wire[..size]).unwrap(), b"hi");
/// ```
pub struct LengthPrefix {
    max_frame: usize,
    /// Total size of the frame being assembled, once the prefix parsed.
    pending: Option<usize>,
}

impl LengthPrefix {
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }

    /// Cap the accepted payload size; larger announcements are framing
    /// errors.
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            max_frame,
            pending: None,
        }
    }
}

impl Default for LengthPrefix {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for LengthPrefix {
    type Message = Vec<u8>;

    fn message_size(&mut self, buf: &[u8]) -> Result<usize, ProtocolError> {
        let total = match self.pending {
            Some(total) => total,
            None => {
                if buf.len() < PREFIX {
                    return Ok(0);
                }
                let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
                if len > self.max_frame {
                    return Err(ProtocolError::FrameTooLarge {
                        size: len,
                        max: self.max_frame,
                    });
                }
                let total = PREFIX + len;
                self.pending = Some(total);
                total
            }
        };
        Ok(if buf.len() >= total { total } else { 0 })
    }

    fn decode(&mut self, frame: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if frame.len() < PREFIX {
            return Err(ProtocolError::Malformed("frame shorter than its prefix"));
        }
        self.pending = None;
        Ok(frame[PREFIX..].to_vec())
    }

    fn encode(&self, message: &Vec<u8>, out: &mut Vec<u8>) {
        out.extend_from_slice(&(message.len() as u32).to_be_bytes());
        out.extend_from_slice(message);
    }

    fn reset(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_prefix_wants_more() {
        let mut proto = LengthPrefix::new();
        assert_eq!(proto.message_size(&[0, 0]).unwrap(), 0);
    }

    #[test]
    fn test_incomplete_payload_wants_more() {
        let mut proto = LengthPrefix::new();
        // Announces 8 bytes of payload, only 3 buffered.
        let buf = [0u8, 0, 0, 8, 1, 2, 3];
        assert_eq!(proto.message_size(&buf).unwrap(), 0);
        // The parsed header is remembered across calls.
        assert!(proto.pending.is_some());
    }

    #[test]
    fn test_roundtrip() {
        let mut proto = LengthPrefix::new();
        let msg = vec![9u8; 300];
        let mut wire = Vec::new();
        proto.encode(&msg, &mut wire);
        let size = proto.message_size(&wire).unwrap();
        assert_eq!(size, 304);
        assert_eq!(proto.decode(&wire[..size]).unwrap(), msg);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut proto = LengthPrefix::new();
        let mut wire = Vec::new();
        proto.encode(&b"one".to_vec(), &mut wire);
        proto.encode(&b"three".to_vec(), &mut wire);

        let size = proto.message_size(&wire).unwrap();
        assert_eq!(proto.decode(&wire[..size]).unwrap(), b"one");
        wire.drain(..size);
        let size = proto.message_size(&wire).unwrap();
        assert_eq!(proto.decode(&wire[..size]).unwrap(), b"three");
        wire.drain(..size);
        assert_eq!(proto.message_size(&wire).unwrap(), 0);
    }

    #[test]
    fn test_empty_payload_is_legal() {
        let mut proto = LengthPrefix::new();
        let mut wire = Vec::new();
        proto.encode(&Vec::new(), &mut wire);
        let size = proto.message_size(&wire).unwrap();
        assert_eq!(size, 4);
        assert!(proto.decode(&wire[..size]).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_announcement_is_an_error() {
        let mut proto = LengthPrefix::with_max_frame(16);
        let wire = [0u8, 0, 1, 0];
        assert!(matches!(
            proto.message_size(&wire),
            Err(ProtocolError::FrameTooLarge { size: 256, max: 16 })
        ));
    }

    #[test]
    fn test_reset_clears_header_state() {
        let mut proto = LengthPrefix::new();
        assert_eq!(proto.message_size(&[0, 0, 0, 8, 1]).unwrap(), 0);
        assert!(proto.pending.is_some());
        proto.reset();
        assert!(proto.pending.is_none());
    }
}
