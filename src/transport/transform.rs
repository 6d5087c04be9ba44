//! Byte-stream transform seam.
//!
//! A transform sits between a session's socket and its buffers: inbound
//! bytes pass through [`Transform::on_input`] before framing, outbound
//! frames through [`Transform::on_output`] before hitting the wire. TLS
//! and compression live behind this trait, outside the runtime; their
//! presence changes throughput, never semantics.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::error::TransportError;

/// Stateful byte-stream transform. Each byte is fed through exactly once,
/// in order.
pub trait Transform: Send + 'static {
    /// Transform bytes read from the wire, appending plaintext to `out`.
    fn on_input(&mut self, raw: &[u8], out: &mut Vec<u8>) -> Result<(), TransportError>;

    /// Transform bytes to be written, appending wire bytes to `out`.
    fn on_output(&mut self, plain: &[u8], out: &mut Vec<u8>) -> Result<(), TransportError>;
}

/// The no-op transform: what a `tcp://` session uses implicitly.
pub struct Identity;

impl Transform for Identity {
    fn on_input(&mut self, raw: &[u8], out: &mut Vec<u8>) -> Result<(), TransportError> {
        out.extend_from_slice(raw);
        Ok(())
    }

    fn on_output(&mut self, plain: &[u8], out: &mut Vec<u8>) -> Result<(), TransportError> {
        out.extend_from_slice(plain);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_transparent() {
        let mut t = Identity;
        let mut out = Vec::new();
        t.on_input(b"abc", &mut out).unwrap();
        t.on_output(b"def", &mut out).unwrap();
        assert_eq!(out, b"abcdef");
    }

    /// A toy transform, standing in for TLS/compression in tests: XORs
    /// every byte, so input(output(x)) == x.
    struct Mask(u8);
    impl Transform for Mask {
        fn on_input(&mut self, raw: &[u8], out: &mut Vec<u8>) -> Result<(), TransportError> {
            out.extend(raw.iter().map(|b| b ^ self.0));
            Ok(())
        }
        fn on_output(&mut self, plain: &[u8], out: &mut Vec<u8>) -> Result<(), TransportError> {
            out.extend(plain.iter().map(|b| b ^ self.0));
            Ok(())
        }
    }

    #[test]
    fn test_transform_roundtrip() {
        let mut t = Mask(0x5a);
        let mut wire = Vec::new();
        t.on_output(b"hello", &mut wire).unwrap();
        assert_ne!(wire, b"hello");
        let mut plain = Vec::new();
        t.on_input(&wire, &mut plain).unwrap();
        assert_eq!(plain, b"hello");
    }
}
