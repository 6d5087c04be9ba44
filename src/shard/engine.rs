//! The per-shard engine: one pinned thread running the tick loop.
//!
//! Tick structure, in order: reactor pass (kernel readiness and timers
//! become inbox events), deferred callbacks, bounded round-robin drain of
//! inbound rings, periodic `on_tick` hooks, the local dispatch walk,
//! outbound flush with a spin budget, and an idle sleep bounded by the
//! next timer and the tick period. Handlers run under `catch_unwind`; a
//! panic kills the actor and the shard keeps ticking.

// Layer 1: Standard library imports
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::core::{ActorMap, ActorSlot, ShardCore};
use crate::actor::{Actor, ActorContext, AnyActor};
use crate::event::envelope::{
    self, read_header, read_prefix, EventHeader, BUCKET_UNIT, FLAG_ALIVE, HEADER_BYTES,
};
use crate::event::registry;
use crate::event::system::{Backpressure, KillEvent};
use crate::event::table::{EventTable, TickFn};
use crate::pipe::PipeError;
use crate::util::ActorId;

pub(crate) struct Shard {
    pub(crate) core: ShardCore,
    pub(crate) actors: ActorMap,
    /// Actors staged before start; initialised on the shard thread.
    pub(crate) pending: Vec<(u16, Box<dyn AnyActor>)>,
    stop: Arc<AtomicBool>,
    error: Arc<AtomicBool>,
    signals: bool,
    kill_type: u32,
    rr_cursor: usize,
    // Slot stand-ins for contexts that run on behalf of the shard itself
    // (deferred callbacks): registrations land here and are discarded.
    scratch_table: EventTable,
    scratch_alive: bool,
    scratch_tick: Option<TickFn>,
}

impl Shard {
    pub(crate) fn new(
        core: ShardCore,
        pending: Vec<(u16, Box<dyn AnyActor>)>,
        stop: Arc<AtomicBool>,
        error: Arc<AtomicBool>,
        signals: bool,
    ) -> Self {
        Self {
            core,
            actors: ActorMap::new(),
            pending,
            stop,
            error,
            signals,
            kill_type: registry::type_id_of::<KillEvent>(),
            rr_cursor: 0,
            scratch_table: EventTable::new(),
            scratch_alive: true,
            scratch_tick: None,
        }
    }

    /// Thread body: pin, initialise staged actors, sync on the start
    /// barrier, tick until stopped, then tear down.
    pub(crate) fn run(&mut self, barrier: &Barrier, core_id: Option<core_affinity::CoreId>) {
        if let Some(id) = core_id {
            core_affinity::set_for_current(id);
        }
        let span = tracing::info_span!("shard", index = self.core.index);
        let _guard = span.enter();
        self.init_pending();
        barrier.wait();
        while !self.stop_requested() {
            self.tick();
        }
        self.shutdown();
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
            || (self.signals && crate::system::signal::stop_requested())
    }

    pub(crate) fn mark_error(&self) {
        self.error.store(true, Ordering::Relaxed);
    }

    /// Initialise the actors staged before start, in staging order.
    pub(crate) fn init_pending(&mut self) {
        let pending = mem::take(&mut self.pending);
        for (sid, actor) in pending {
            let id = ActorId::new(sid, self.core.index);
            let mut slot = ActorSlot::new(id, actor);
            let ok = {
                let mut ctx = ActorContext {
                    core: &mut self.core,
                    actors: &mut self.actors,
                    current: id,
                    source: ActorId::NULL,
                    table: &mut slot.table,
                    alive: &mut slot.alive,
                    tick: &mut slot.tick,
                };
                slot.actor.on_init(&mut ctx)
            };
            if ok && slot.alive {
                self.actors.insert(sid, slot);
            } else {
                tracing::warn!(actor = %id, "on_init declined, actor dropped");
            }
        }
    }

    /// One scheduling iteration.
    pub(crate) fn tick(&mut self) {
        self.core.now = Instant::now();

        let timeout = self.poll_timeout();
        if let Err(e) = self.core.reactor.run_once(timeout, &mut self.core.inbox) {
            tracing::error!(error = %e, "reactor pass failed");
            if e.is_fatal() {
                self.mark_error();
                self.stop.store(true, Ordering::Relaxed);
                return;
            }
        }

        self.run_callbacks();
        self.drain_inbound();
        self.run_ticks();
        self.dispatch_inbox();
        self.flush_outbound();
    }

    /// Sleep budget for the reactor: zero when any work is pending, else
    /// until the next timer, capped at the tick period so stop requests
    /// are honoured promptly.
    fn poll_timeout(&mut self) -> Option<Duration> {
        let pending = !self.core.inbox.is_empty()
            || self.core.reactor.has_due_callbacks()
            || self.core.staging.iter().any(|s| !s.is_empty())
            || self
                .core
                .consumers
                .iter_mut()
                .flatten()
                .any(|c| c.has_pending());
        if pending {
            return Some(Duration::ZERO);
        }
        let cap = self.core.tick_period;
        let until_timer = self
            .core
            .reactor
            .next_timer_deadline()
            .map(|d| d.saturating_duration_since(self.core.now));
        Some(until_timer.map_or(cap, |t| t.min(cap)))
    }

    fn run_callbacks(&mut self) {
        let callbacks = self.core.reactor.take_callbacks();
        if callbacks.is_empty() {
            return;
        }
        for f in callbacks {
            let result = catch_unwind(AssertUnwindSafe(|| {
                let mut ctx = ActorContext {
                    core: &mut self.core,
                    actors: &mut self.actors,
                    current: ActorId::NULL,
                    source: ActorId::NULL,
                    table: &mut self.scratch_table,
                    alive: &mut self.scratch_alive,
                    tick: &mut self.scratch_tick,
                };
                f(&mut ctx);
            }));
            if result.is_err() {
                self.core.stats.record_handler_panic();
                tracing::error!("deferred callback panicked");
            }
        }
        self.scratch_table = EventTable::new();
        self.scratch_alive = true;
        self.scratch_tick = None;
    }

    /// Round-robin bounded drain of every peer ring into the local inbox.
    fn drain_inbound(&mut self) {
        let n = self.core.consumers.len();
        if n == 0 {
            return;
        }
        let max_events = self.core.drain_max_events;
        let max_bytes = self.core.drain_max_bytes;
        let start = self.rr_cursor;
        for k in 0..n {
            let p = (start + k) % n;
            let ShardCore {
                consumers, inbox, ..
            } = &mut self.core;
            let Some(consumer) = consumers[p].as_mut() else {
                continue;
            };
            consumer.drain(max_events, max_bytes, &mut |bucket| {
                inbox.append_bytes(bucket)
            });
        }
        self.rr_cursor = (start + 1) % n;
    }

    /// Invoke `on_tick` for every actor with a registered hook.
    fn run_ticks(&mut self) {
        let sids: Vec<u16> = self
            .actors
            .iter()
            .filter(|(_, s)| s.alive && s.tick.is_some())
            .map(|(sid, _)| *sid)
            .collect();
        for sid in sids {
            let Some(mut slot) = self.actors.remove(&sid) else {
                continue;
            };
            if let Some(tick_fn) = slot.tick {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    let mut ctx = ActorContext {
                        core: &mut self.core,
                        actors: &mut self.actors,
                        current: slot.id,
                        source: ActorId::NULL,
                        table: &mut slot.table,
                        alive: &mut slot.alive,
                        tick: &mut slot.tick,
                    };
                    tick_fn(slot.actor.as_any_mut(), &mut ctx);
                }));
                if result.is_err() {
                    self.core.stats.record_handler_panic();
                    tracing::error!(actor = %slot.id, "on_tick panicked, actor killed");
                    slot.alive = false;
                }
            }
            if slot.alive {
                self.actors.insert(sid, slot);
            } else {
                self.finalize(slot);
            }
        }
    }

    /// Walk the inbox and dispatch every bucket. Handlers may append more
    /// local events during the walk; they are delivered in the same pass.
    fn dispatch_inbox(&mut self) {
        let mut off = 0;
        loop {
            if off >= self.core.inbox.len_bytes() {
                break;
            }
            let (_, bucket_size, flags) = unsafe { read_prefix(self.core.inbox.base().add(off)) };
            let bytes = bucket_size as usize * BUCKET_UNIT;
            if flags & FLAG_ALIVE == 0 {
                off += bytes;
                continue;
            }
            let header = unsafe { read_header(self.core.inbox.base().add(off)) };
            let payload_off = off + HEADER_BYTES;
            off += bytes;
            if header.is_broadcast() {
                self.deliver_broadcast(&header, payload_off);
            } else {
                let value = self.resolve_payload(&header, payload_off);
                let shell = header.is_live_alloc();
                if header.type_id == self.kill_type {
                    self.deliver_kill(&header, value, shell);
                } else {
                    self.dispatch_to(header.dest.service_id(), &header, value, shell);
                }
            }
        }
        self.core.inbox.clear();
    }

    /// Resolve a bucket's payload to a value pointer, following the heap
    /// indirection for `FLAG_LIVE_ALLOC` buckets.
    fn resolve_payload(&mut self, header: &EventHeader, payload_off: usize) -> *mut u8 {
        unsafe {
            let inline = self.core.inbox.base_mut().add(payload_off);
            if header.is_live_alloc() {
                (inline as *const usize).read() as *mut u8
            } else {
                inline
            }
        }
    }

    fn deliver_kill(&mut self, header: &EventHeader, value: *mut u8, shell: bool) {
        let row = registry::row(header.type_id);
        unsafe {
            (row.drop_fn)(value);
            if shell {
                envelope::dealloc_shell(value, row.size, row.align);
            }
        }
        let sid = header.dest.service_id();
        if let Some(mut slot) = self.actors.remove(&sid) {
            slot.alive = false;
            self.finalize(slot);
        }
    }

    /// Deliver a value to one actor. `value` is a resolved payload
    /// pointer; the value is consumed exactly once (handler move, or the
    /// drop thunk). When `shell` is set the pointed-at allocation is
    /// released afterwards.
    fn dispatch_to(&mut self, sid: u16, header: &EventHeader, value: *mut u8, shell: bool) {
        let row = registry::row(header.type_id);
        match self.actors.remove(&sid) {
            None => {
                unsafe { (row.drop_fn)(value) };
                self.core.stats.record_dropped();
            }
            Some(mut slot) => {
                match slot.table.get(header.type_id) {
                    None => {
                        // Fire-and-forget contract: no handler, no error.
                        unsafe { (row.drop_fn)(value) };
                        self.core.stats.record_dropped();
                        tracing::trace!(
                            actor = %slot.id,
                            event = row.name,
                            "no handler registered, event dropped"
                        );
                    }
                    Some(thunk) => {
                        let panicked = catch_unwind(AssertUnwindSafe(|| {
                            let mut ctx = ActorContext {
                                core: &mut self.core,
                                actors: &mut self.actors,
                                current: slot.id,
                                source: header.source,
                                table: &mut slot.table,
                                alive: &mut slot.alive,
                                tick: &mut slot.tick,
                            };
                            unsafe { thunk(slot.actor.as_any_mut(), &mut ctx, value) };
                        }))
                        .is_err();
                        self.core.stats.record_dispatched();
                        if panicked {
                            self.core.stats.record_handler_panic();
                            tracing::error!(actor = %slot.id, event = row.name, "handler panicked, actor killed");
                            slot.alive = false;
                        }
                    }
                }
                if slot.alive {
                    self.actors.insert(sid, slot);
                } else {
                    self.finalize(slot);
                }
            }
        }
        if shell {
            unsafe { envelope::dealloc_shell(value, row.size, row.align) };
        }
    }

    /// Deliver one copy to every alive actor on this shard: clones for all
    /// receivers but the last, which takes the buffered value.
    fn deliver_broadcast(&mut self, header: &EventHeader, payload_off: usize) {
        let mut sids: Vec<u16> = self
            .actors
            .iter()
            .filter(|(_, s)| s.alive)
            .map(|(sid, _)| *sid)
            .collect();
        sids.sort_unstable();
        if sids.is_empty() {
            let value = self.resolve_payload(header, payload_off);
            let row = registry::row(header.type_id);
            unsafe {
                (row.drop_fn)(value);
                if header.is_live_alloc() {
                    envelope::dealloc_shell(value, row.size, row.align);
                }
            }
            self.core.stats.record_dropped();
            return;
        }
        let row = registry::row(header.type_id);
        let receivers: &[u16] = if row.clone_fn.is_some() {
            &sids
        } else {
            if sids.len() > 1 {
                tracing::warn!(
                    event = row.name,
                    "broadcast of type without a clone thunk, delivering a single copy"
                );
            }
            &sids[sids.len() - 1..]
        };
        let last = receivers.len() - 1;
        for (i, &sid) in receivers.iter().enumerate() {
            if i == last {
                let value = self.resolve_payload(header, payload_off);
                self.dispatch_to(sid, header, value, header.is_live_alloc());
            } else {
                // Pointers are re-resolved per receiver: earlier handlers
                // may have grown the inbox and moved the buffer.
                let src = self.resolve_payload(header, payload_off);
                let clone = unsafe { envelope::clone_payload(header, src) };
                debug_assert!(!clone.is_null());
                self.dispatch_to(sid, header, clone, true);
            }
        }
    }

    /// Copy staged buckets into the per-destination rings. A destination
    /// that stays full past the tick-period budget leaves its remaining
    /// buckets staged for the next tick and synthesises one
    /// [`Backpressure`] event per distinct local sender.
    fn flush_outbound(&mut self) {
        let peer_count = self.core.staging.len();
        for peer in 0..peer_count {
            if peer == self.core.index as usize || self.core.staging[peer].is_empty() {
                continue;
            }
            if self.core.producers[peer].is_none() {
                // Peer shard never started; its traffic is undeliverable.
                envelope::release_all(&mut self.core.staging[peer]);
                continue;
            }
            if self.flush_peer(peer) {
                self.core.stats.record_pipe_stall();
                self.synthesize_backpressure(peer);
            }
        }
    }

    /// Flush one destination's staging buffer; true when it stalled.
    fn flush_peer(&mut self, peer: usize) -> bool {
        let budget = self.core.tick_period;
        let ShardCore {
            staging, producers, ..
        } = &mut self.core;
        let staging = &mut staging[peer];
        let Some(producer) = producers[peer].as_mut() else {
            return false;
        };
        let total = staging.len_bytes();
        let mut flushed = 0;
        let mut deadline: Option<Instant> = None;
        let mut stalled = false;
        while flushed < total {
            let (_, bucket_size, _) = unsafe { read_prefix(staging.base().add(flushed)) };
            let bytes = bucket_size as usize * BUCKET_UNIT;
            let bucket = &staging.bytes()[flushed..flushed + bytes];
            match producer.write_bucket(bucket) {
                Ok(()) => flushed += bytes,
                Err(PipeError::Oversized { .. }) => {
                    let header = unsafe { read_header(staging.base().add(flushed)) };
                    tracing::error!(
                        event = registry::name_of(header.type_id),
                        "bucket larger than pipe ceiling, dropped"
                    );
                    unsafe {
                        let base = staging.base_mut();
                        envelope::release_payload(&header, base.add(flushed + HEADER_BYTES));
                    }
                    flushed += bytes;
                }
                Err(PipeError::Full) => {
                    producer.publish();
                    let limit = *deadline.get_or_insert_with(|| Instant::now() + budget);
                    if !spin_write(producer, bucket, limit) {
                        stalled = true;
                        break;
                    }
                    flushed += bytes;
                }
            }
        }
        producer.publish();
        if flushed > 0 {
            staging.consume_front(flushed);
        }
        stalled
    }

    /// One `Backpressure` event per distinct local sender with traffic
    /// still staged for `peer`.
    fn synthesize_backpressure(&mut self, peer: usize) {
        let mut sources: Vec<ActorId> = Vec::new();
        let mut pending = 0usize;
        let mut off = 0;
        while off < self.core.staging[peer].len_bytes() {
            let header = unsafe { read_header(self.core.staging[peer].base().add(off)) };
            pending += 1;
            if !header.source.is_null() && !sources.contains(&header.source) {
                sources.push(header.source);
            }
            off += header.bucket_bytes();
        }
        for source in sources {
            if source.shard_index() != self.core.index {
                continue;
            }
            envelope::push_event(
                &mut self.core.inbox,
                ActorId::NULL,
                source,
                0,
                Backpressure {
                    shard: peer as u16,
                    pending,
                },
                self.core.max_inline,
            );
        }
    }

    /// Reap one actor: run `on_stop`, then drop the slot.
    fn finalize(&mut self, mut slot: ActorSlot) {
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = ActorContext {
                core: &mut self.core,
                actors: &mut self.actors,
                current: slot.id,
                source: ActorId::NULL,
                table: &mut slot.table,
                alive: &mut slot.alive,
                tick: &mut slot.tick,
            };
            slot.actor.on_stop(&mut ctx);
        }));
        if result.is_err() {
            tracing::error!(actor = %slot.id, "on_stop panicked");
        }
    }

    /// Tear-down after the tick loop exits: finalise every actor, attempt
    /// a last outbound flush, and release whatever never got dispatched.
    fn shutdown(&mut self) {
        let mut sids: Vec<u16> = self.actors.keys().copied().collect();
        sids.sort_unstable();
        for sid in sids {
            if let Some(slot) = self.actors.remove(&sid) {
                self.finalize(slot);
            }
        }
        self.flush_outbound();
        envelope::release_all(&mut self.core.inbox);
        for peer in 0..self.core.staging.len() {
            envelope::release_all(&mut self.core.staging[peer]);
        }
        tracing::debug!(stats = ?self.core.stats.snapshot(), "shard stopped");
    }
}

/// Retry a full-ring write until it lands or `deadline` passes. Spins
/// briefly, then yields the thread between attempts.
fn spin_write(
    producer: &mut crate::pipe::PipeProducer,
    bucket: &[u8],
    deadline: Instant,
) -> bool {
    let mut attempts = 0u32;
    loop {
        match producer.write_bucket(bucket) {
            Ok(()) => return true,
            Err(_) => {
                if Instant::now() >= deadline {
                    return false;
                }
                attempts += 1;
                if attempts < 64 {
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
            }
        }
    }
}
