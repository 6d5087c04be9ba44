//! Relaxed atomic per-shard counters.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Counters one shard maintains while ticking.
///
/// Writers are the owning shard only; readers are anyone holding the
/// shared handle (typically the runtime after `join`). All accesses are
/// relaxed: these are statistics, not synchronisation.
#[derive(Debug, Default)]
pub struct ShardStats {
    dispatched: AtomicU64,
    sent_local: AtomicU64,
    sent_remote: AtomicU64,
    dropped: AtomicU64,
    pipe_stalls: AtomicU64,
    handler_panics: AtomicU64,
}

impl ShardStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent_local(&self) {
        self.sent_local.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent_remote(&self) {
        self.sent_remote.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pipe_stall(&self) {
        self.pipe_stalls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handler_panic(&self) {
        self.handler_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            sent_local: self.sent_local.load(Ordering::Relaxed),
            sent_remote: self.sent_remote.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pipe_stalls: self.pipe_stalls.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
        }
    }
}

/// Copied-out counter values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Events delivered to a handler on this shard.
    pub dispatched: u64,
    /// Events sent to destinations on the same shard.
    pub sent_local: u64,
    /// Events staged for other shards.
    pub sent_remote: u64,
    /// Events dropped (dead actor, no handler, shutdown).
    pub dropped: u64,
    /// Outbound flushes that gave up within a tick budget.
    pub pipe_stalls: u64,
    /// Handler panics caught at the dispatch boundary.
    pub handler_panics: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = ShardStats::new();
        stats.record_dispatched();
        stats.record_dispatched();
        stats.record_sent_local();
        stats.record_dropped();
        let snap = stats.snapshot();
        assert_eq!(snap.dispatched, 2);
        assert_eq!(snap.sent_local, 1);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.sent_remote, 0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let stats = ShardStats::new();
        let before = stats.snapshot();
        stats.record_pipe_stall();
        assert_eq!(before.pipe_stalls, 0);
        assert_eq!(stats.snapshot().pipe_stalls, 1);
    }
}
