//! Byte-stream framing: the [`Protocol`] contract and two ready-made
//! strategies.
//!
//! # Components
//!
//! - [`Protocol`] - `message_size` / `decode` / `encode` / `reset`
//! - [`LengthPrefix`] - u32 big-endian length + payload
//! - [`Delimited`] - Delimiter-terminated frames (newline text protocols)
//! - [`ProtocolError`] - Framing violations
//!
//! Custom binary schemas (fixed headers with magic/version fields,
//! HTTP/1.x-style header parsing) implement the same trait; the session
//! machinery does not care how the size of the next message is computed.

pub mod delimited;
pub mod length;
pub mod traits;

pub use delimited::Delimited;
pub use length::{LengthPrefix, DEFAULT_MAX_FRAME};
pub use traits::{Protocol, ProtocolError};
