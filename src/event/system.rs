//! Events originated by the runtime itself.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::traits::Event;

/// Requests that the destination actor be killed.
///
/// Handled by the dispatcher itself, before any handler lookup: the target
/// is marked dead and reaped once the in-flight dispatch completes, which
/// makes cross-shard kills safe without per-actor bookkeeping races.
///
/// # Example
/// ```rust,ignore
/// ctx.push(stale_worker, KillEvent);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct KillEvent;

impl Event for KillEvent {
    const NAME: &'static str = "kill";
}

/// Synthesised when an outbound pipe to `shard` stalled past its flush
/// budget.
///
/// The stalled events are *not* lost: they stay staged and are retried on
/// the following ticks. This event is the only visible backpressure signal;
/// sender policy decides whether to throttle, rebalance, or ignore it.
#[derive(Debug, Clone, Copy)]
pub struct Backpressure {
    /// Index of the congested destination shard.
    pub shard: u16,
    /// Events still staged for that shard when the flush gave up.
    pub pending: usize,
}

impl Event for Backpressure {
    const NAME: &'static str = "backpressure";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(KillEvent::NAME, "kill");
        assert_eq!(Backpressure::NAME, "backpressure");
    }

    #[test]
    fn test_backpressure_is_broadcastable() {
        fn requires_clone<E: Event + Clone>() {}
        requires_clone::<Backpressure>();
    }
}
