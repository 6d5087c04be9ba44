//! Hashed timer wheel: 64 buckets of configurable granularity.
//!
//! Expiry is best-effort within one granule: a timer requested for instant
//! `t` fires no earlier than `t` and no later than `t + granularity` (plus
//! whatever the kernel adds to the poll wake-up). Deadlines are tracked as
//! whole granules since the wheel's epoch, so entries cost two u64s and a
//! target.

// Layer 1: Standard library imports
use std::collections::HashSet;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::events::TimerId;
use crate::actor::ActorContext;
use crate::util::ActorId;

/// Number of wheel buckets.
const WHEEL_SLOTS: u64 = 64;

/// Default wheel granularity.
pub const DEFAULT_GRANULARITY: Duration = Duration::from_millis(10);

/// Deferred work scheduled on the reactor.
pub type Callback = Box<dyn FnOnce(&mut ActorContext<'_>) + Send + 'static>;

pub(crate) enum TimerTarget {
    /// Enqueue a `TimerFired` event on this actor.
    Actor(ActorId),
    /// Hand the closure to the engine's callback queue.
    Callback(Callback),
}

struct TimerEntry {
    id: u64,
    /// Absolute deadline in granules since the epoch.
    deadline: u64,
    /// Re-arm interval in granules for periodic timers.
    period: Option<u64>,
    target: TimerTarget,
}

pub(crate) struct TimerWheel {
    buckets: Vec<Vec<TimerEntry>>,
    granularity: Duration,
    epoch: Instant,
    /// Next granule to process.
    cursor: u64,
    next_id: u64,
    live: usize,
    cancelled: HashSet<u64>,
}

impl TimerWheel {
    pub(crate) fn new(granularity: Duration) -> Self {
        let granularity = if granularity.is_zero() {
            DEFAULT_GRANULARITY
        } else {
            granularity
        };
        Self {
            buckets: (0..WHEEL_SLOTS).map(|_| Vec::new()).collect(),
            granularity,
            epoch: Instant::now(),
            cursor: 0,
            next_id: 1,
            live: 0,
            cancelled: HashSet::new(),
        }
    }

    pub(crate) fn granularity(&self) -> Duration {
        self.granularity
    }

    /// Granule index whose processing time is no earlier than `at`.
    fn granule_at_or_after(&self, at: Instant) -> u64 {
        let elapsed = at.saturating_duration_since(self.epoch).as_nanos();
        let g = self.granularity.as_nanos();
        (elapsed.div_ceil(g)) as u64
    }

    /// Schedule a timer `after` from `now`, optionally periodic.
    pub(crate) fn schedule(
        &mut self,
        now: Instant,
        after: Duration,
        period: Option<Duration>,
        target: TimerTarget,
    ) -> TimerId {
        let deadline = self.granule_at_or_after(now + after).max(self.cursor);
        let period = period.map(|p| {
            let g = self.granularity.as_nanos();
            ((p.as_nanos().div_ceil(g)) as u64).max(1)
        });
        let id = self.next_id;
        self.next_id += 1;
        let slot = (deadline % WHEEL_SLOTS) as usize;
        self.buckets[slot].push(TimerEntry {
            id,
            deadline,
            period,
            target,
        });
        self.live += 1;
        TimerId(id)
    }

    /// Cancel a timer. Synchronous from the owning shard: a cancelled
    /// entry never fires, even if its granule already elapsed.
    pub(crate) fn cancel(&mut self, id: TimerId) {
        self.cancelled.insert(id.0);
    }

    /// Process every granule up to `now`, invoking `on_actor` for actor
    /// timers and `on_callback` for deferred closures.
    pub(crate) fn advance(
        &mut self,
        now: Instant,
        mut on_actor: impl FnMut(ActorId, TimerId),
        mut on_callback: impl FnMut(Callback),
    ) {
        if self.live == 0 && self.cancelled.is_empty() {
            // Keep the cursor current so idle periods do not accumulate
            // empty granules to walk later.
            self.cursor = self.cursor.max(self.current_granule(now));
            return;
        }
        let target = self.current_granule(now);
        while self.cursor <= target {
            let slot = (self.cursor % WHEEL_SLOTS) as usize;
            let mut i = 0;
            while i < self.buckets[slot].len() {
                if self.buckets[slot][i].deadline > self.cursor {
                    i += 1;
                    continue;
                }
                let entry = self.buckets[slot].swap_remove(i);
                if self.cancelled.remove(&entry.id) {
                    self.live -= 1;
                    continue;
                }
                match entry.target {
                    TimerTarget::Actor(actor) => {
                        on_actor(actor, TimerId(entry.id));
                        if let Some(p) = entry.period {
                            let deadline = self.cursor + p;
                            let slot = (deadline % WHEEL_SLOTS) as usize;
                            self.buckets[slot].push(TimerEntry {
                                id: entry.id,
                                deadline,
                                period: entry.period,
                                target: TimerTarget::Actor(actor),
                            });
                        } else {
                            self.live -= 1;
                        }
                    }
                    TimerTarget::Callback(f) => {
                        on_callback(f);
                        self.live -= 1;
                    }
                }
            }
            self.cursor += 1;
        }
    }

    /// Earliest instant at which a live timer becomes due, if any.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        if self.live == 0 {
            return None;
        }
        let mut min: Option<u64> = None;
        for bucket in &self.buckets {
            for entry in bucket {
                if self.cancelled.contains(&entry.id) {
                    continue;
                }
                min = Some(min.map_or(entry.deadline, |m: u64| m.min(entry.deadline)));
            }
        }
        min.map(|granule| {
            self.epoch + Duration::from_nanos(self.granularity.as_nanos() as u64 * granule)
        })
    }

    fn current_granule(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.epoch).as_nanos();
        (elapsed / self.granularity.as_nanos()) as u64
    }
}
