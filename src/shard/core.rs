//! Shard-owned state: actor slots and the per-shard buffers and reactor.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::actor::AnyActor;
use crate::event::table::{EventTable, TickFn};
use crate::pipe::{LocalPipe, PipeConsumer, PipeProducer};
use crate::reactor::Reactor;
use crate::stats::ShardStats;
use crate::util::ActorId;

/// One hosted actor: state, liveness, and dispatch tables.
pub(crate) struct ActorSlot {
    pub id: ActorId,
    pub actor: Box<dyn AnyActor>,
    pub alive: bool,
    pub table: EventTable,
    pub tick: Option<TickFn>,
}

impl ActorSlot {
    pub(crate) fn new(id: ActorId, actor: Box<dyn AnyActor>) -> Self {
        Self {
            id,
            actor,
            alive: true,
            table: EventTable::new(),
            tick: None,
        }
    }
}

/// Live actors on a shard, keyed by service id.
pub(crate) type ActorMap = HashMap<u16, ActorSlot>;

/// Allocate the next free service id on a shard.
///
/// Ids are handed out monotonically and wrap, skipping zero (broadcast)
/// and ids still in use; `None` means the shard genuinely hosts 65535
/// actors.
pub(crate) fn alloc_sid(next_sid: &mut u16, actors: &ActorMap) -> Option<u16> {
    for _ in 0..=u16::MAX as u32 {
        let sid = *next_sid;
        *next_sid = next_sid.wrapping_add(1);
        if sid == 0 || actors.contains_key(&sid) {
            continue;
        }
        return Some(sid);
    }
    None
}

/// Everything on a shard that actor code may touch through its context.
///
/// Kept separate from the [`ActorMap`] so the engine can lend a handler
/// `&mut` access to the shard while the handler's own slot is checked out
/// of the map.
pub(crate) struct ShardCore {
    pub index: u16,
    pub shard_count: u16,
    /// Local inbox: reactor events, drained cross-shard events, and
    /// same-shard sends, walked once per tick.
    pub inbox: LocalPipe,
    /// Outbound staging, one buffer per destination shard.
    pub staging: Vec<LocalPipe>,
    /// Ring producers towards each peer shard.
    pub producers: Vec<Option<PipeProducer>>,
    /// Ring consumers from each peer shard.
    pub consumers: Vec<Option<PipeConsumer>>,
    pub reactor: Reactor,
    pub stats: Arc<ShardStats>,
    /// Flush/backpressure budget and the idle sleep cap.
    pub tick_period: Duration,
    /// Largest payload constructed inline in a bucket.
    pub max_inline: usize,
    /// Inbound drain bounds per peer per tick.
    pub drain_max_events: usize,
    pub drain_max_bytes: usize,
    /// Monotonic clock cached at tick start.
    pub now: Instant,
    pub next_sid: u16,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_sid_skips_zero_and_used() {
        let mut actors = ActorMap::new();
        let mut next = 0u16;
        let first = alloc_sid(&mut next, &actors).unwrap();
        assert_eq!(first, 1);
        actors.insert(
            2,
            ActorSlot::new(ActorId::new(2, 0), Box::new(NoopActor)),
        );
        assert_eq!(alloc_sid(&mut next, &actors), Some(3));
    }

    #[test]
    fn test_alloc_sid_wraps_around() {
        let actors = ActorMap::new();
        let mut next = u16::MAX;
        assert_eq!(alloc_sid(&mut next, &actors), Some(u16::MAX));
        // Wrapped past zero.
        assert_eq!(alloc_sid(&mut next, &actors), Some(1));
    }

    struct NoopActor;
    impl crate::actor::Actor for NoopActor {}
}
