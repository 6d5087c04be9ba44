//! Events the reactor enqueues on actor inboxes.
//!
//! Readiness and timer expiry are indistinguishable from application
//! events at the scheduling layer: the reactor translates them into these
//! types and appends them to the owning actor's inbox, and the ordinary
//! dispatch walk delivers them.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::event::Event;

/// Opaque handle for a registered I/O watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoToken(pub(crate) usize);

/// Handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub(crate) u64);

/// The watched source became readable (including peer half-close, which a
/// subsequent read reports as end-of-stream).
#[derive(Debug, Clone, Copy)]
pub struct Readable {
    pub token: IoToken,
}

impl Event for Readable {
    const NAME: &'static str = "io_readable";
}

/// The watched source became writable.
#[derive(Debug, Clone, Copy)]
pub struct Writable {
    pub token: IoToken,
}

impl Event for Writable {
    const NAME: &'static str = "io_writable";
}

/// The kernel reported an error condition on the watched source.
///
/// The owning session queries the socket for the last error code; the
/// reactor itself never throws to its caller.
#[derive(Debug, Clone, Copy)]
pub struct Disconnected {
    pub token: IoToken,
}

impl Event for Disconnected {
    const NAME: &'static str = "io_disconnected";
}

/// A one-shot or periodic timer expired on the registering shard.
#[derive(Debug, Clone, Copy)]
pub struct TimerFired {
    pub timer: TimerId,
}

impl Event for TimerFired {
    const NAME: &'static str = "timer_fired";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Readable::NAME, "io_readable");
        assert_eq!(Writable::NAME, "io_writable");
        assert_eq!(Disconnected::NAME, "io_disconnected");
        assert_eq!(TimerFired::NAME, "timer_fired");
    }

    #[test]
    fn test_tokens_compare_by_value() {
        assert_eq!(IoToken(3), IoToken(3));
        assert_ne!(TimerId(1), TimerId(2));
    }
}
