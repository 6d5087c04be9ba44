//! Per-dispatch actor context: identity, sends, timers, watchers, spawn.

// Layer 1: Standard library imports
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use mio::event::Source;
use mio::Interest;

// Layer 3: Internal module imports
use super::traits::{Actor, Handle, Tick};
use crate::event::envelope;
use crate::event::registry;
use crate::event::table::{self, EventTable, Registered, TickFn};
use crate::event::Event;
use crate::reactor::{Callback, IoToken, ReactorError, TimerId};
use crate::shard::core::{alloc_sid, ActorMap, ActorSlot, ShardCore};
use crate::system::SystemError;
use crate::util::ActorId;

/// Handle through which actor code talks to its shard.
///
/// A context is only ever constructed by the shard engine, for the
/// duration of one handler invocation (or `on_init`/`on_tick`/`on_stop`,
/// or a deferred callback). All operations are non-blocking; sends are
/// asynchronous and complete after the handler returns.
pub struct ActorContext<'a> {
    pub(crate) core: &'a mut ShardCore,
    pub(crate) actors: &'a mut ActorMap,
    pub(crate) current: ActorId,
    pub(crate) source: ActorId,
    pub(crate) table: &'a mut EventTable,
    pub(crate) alive: &'a mut bool,
    pub(crate) tick: &'a mut Option<TickFn>,
}

impl ActorContext<'_> {
    /// Id of the actor this context belongs to (null inside deferred
    /// callbacks, which run on behalf of the shard).
    pub fn id(&self) -> ActorId {
        self.current
    }

    /// Source of the event being dispatched; null outside event handlers.
    pub fn source(&self) -> ActorId {
        self.source
    }

    /// Index of the shard this context runs on.
    pub fn shard(&self) -> u16 {
        self.core.index
    }

    /// Number of shards in the runtime.
    pub fn shard_count(&self) -> u16 {
        self.core.shard_count
    }

    /// Monotonic clock cached at the start of the current tick. Cheap
    /// enough to call per event; precise enough for protocol timeouts.
    pub fn time(&self) -> Instant {
        self.core.now
    }

    /// Send `event` to `dest`, constructing it in place in the outbound
    /// buffer. Same-shard destinations receive it later this tick, other
    /// shards after the end-of-tick flush.
    ///
    /// The returned reference stays valid until the next send from this
    /// shard, which the borrow on `self` enforces.
    ///
    /// # Panics
    /// Panics if `dest` names a shard outside the runtime; ids are only
    /// ever minted by shards, so this indicates a corrupted id.
    pub fn push<E: Event>(&mut self, dest: ActorId, event: E) -> &mut E {
        self.send_raw(self.current, dest, event)
    }

    /// Deliver one copy of `event` to every alive actor on `shard`, in
    /// FIFO order relative to other sends from this shard.
    pub fn broadcast<E: Event + Clone>(&mut self, shard: u16, event: E) {
        registry::ensure_clone::<E>();
        self.send_raw(self.current, ActorId::broadcast(shard), event);
    }

    /// Send `event` back to the source of the event being handled.
    ///
    /// Outside of a handler (no source) the event is dropped with a
    /// warning.
    pub fn reply<E: Event>(&mut self, event: E) {
        if self.source.is_null() {
            tracing::warn!(actor = %self.current, event = E::NAME, "reply with no source, dropped");
            return;
        }
        self.send_raw(self.current, self.source, event);
    }

    /// Re-route `event` to `dest`, preserving the original source so the
    /// receiver can still reply to the originator.
    pub fn forward<E: Event>(&mut self, dest: ActorId, event: E) {
        self.send_raw(self.source, dest, event);
    }

    /// Mark this actor dead. The current handler completes normally; the
    /// shard reaps the actor before dispatching the next event, running
    /// [`on_stop`](crate::actor::Actor::on_stop).
    pub fn kill(&mut self) {
        *self.alive = false;
    }

    /// Construct an actor on this shard. Its `on_init` runs synchronously;
    /// a `false` return (or a kill during init) aborts construction and
    /// surfaces as an error.
    pub fn spawn<A: Actor>(&mut self, actor: A) -> Result<ActorId, SystemError> {
        let sid = alloc_sid(&mut self.core.next_sid, self.actors)
            .ok_or(SystemError::ShardFull { shard: self.core.index })?;
        let id = ActorId::new(sid, self.core.index);
        let mut slot = ActorSlot::new(id, Box::new(actor));
        let ok = {
            let mut ctx = ActorContext {
                core: &mut *self.core,
                actors: &mut *self.actors,
                current: id,
                source: ActorId::NULL,
                table: &mut slot.table,
                alive: &mut slot.alive,
                tick: &mut slot.tick,
            };
            slot.actor.on_init(&mut ctx)
        };
        if !ok || !slot.alive {
            tracing::warn!(actor = %id, "on_init declined, construction aborted");
            return Err(SystemError::ActorInitFailed(id));
        }
        self.actors.insert(sid, slot);
        Ok(id)
    }

    /// Register the `Handle<E>` implementation of actor type `A` for
    /// events of type `E` on this actor.
    ///
    /// Idempotent for the same implementation. Replacing a different
    /// handler is a bug: fatal in debug builds, last-wins with a warning
    /// in release builds.
    pub fn register_event<E: Event, A: Handle<E>>(&mut self) {
        let type_id = registry::type_id_of::<E>();
        let thunk = table::handler_thunk::<A, E> as table::HandlerFn;
        if self.table.insert(type_id, thunk) == Registered::Replaced {
            debug_assert!(
                false,
                "handler for {} replaced on actor {}",
                E::NAME,
                self.current
            );
            tracing::warn!(actor = %self.current, event = E::NAME, "duplicate handler replaced");
        }
    }

    /// Remove this actor's handler for `E`. Subsequent `E` events are
    /// silently dropped, as for any unhandled type.
    pub fn unregister_event<E: Event>(&mut self) {
        self.table.remove(registry::type_id_of::<E>());
    }

    /// Register this actor's [`Tick::on_tick`] to run once per shard tick.
    pub fn register_tick<A: Tick>(&mut self) {
        *self.tick = Some(table::tick_thunk::<A>);
    }

    /// Remove the periodic tick registration.
    pub fn unregister_tick(&mut self) {
        *self.tick = None;
    }

    /// Arm a timer delivering [`TimerFired`](crate::reactor::TimerFired)
    /// to this actor after `after`, re-arming every `period` if given.
    pub fn set_timer(&mut self, after: Duration, period: Option<Duration>) -> TimerId {
        self.core.reactor.schedule(self.current, after, period)
    }

    /// Cancel a timer armed on this shard.
    pub fn cancel_timer(&mut self, timer: TimerId) {
        self.core.reactor.cancel(timer);
    }

    /// Run `f` on this shard after `delay`; a zero delay runs it later in
    /// the current tick, before the reactor can block again. The closure
    /// receives a shard-scoped context with a null actor id.
    pub fn callback<F>(&mut self, delay: Duration, f: F)
    where
        F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
    {
        self.core.reactor.defer(delay, Box::new(f) as Callback);
    }

    /// Watch an I/O source; readiness arrives at this actor as typed
    /// events.
    pub fn watch<S: Source + ?Sized>(
        &mut self,
        source: &mut S,
        interest: Interest,
    ) -> Result<IoToken, ReactorError> {
        self.core.reactor.watch(source, self.current, interest)
    }

    /// Change a watcher's interest set.
    pub fn rearm<S: Source + ?Sized>(
        &mut self,
        token: IoToken,
        source: &mut S,
        interest: Interest,
    ) -> Result<(), ReactorError> {
        self.core.reactor.rearm(token, source, interest)
    }

    /// Cancel a watcher.
    pub fn unwatch<S: Source + ?Sized>(
        &mut self,
        token: IoToken,
        source: &mut S,
    ) -> Result<(), ReactorError> {
        self.core.reactor.unwatch(token, source)
    }

    fn send_raw<E: Event>(&mut self, source: ActorId, dest: ActorId, event: E) -> &mut E {
        let shard = dest.shard_index();
        let ptr = if shard == self.core.index {
            self.core.stats.record_sent_local();
            envelope::push_event(
                &mut self.core.inbox,
                source,
                dest,
                0,
                event,
                self.core.max_inline,
            )
        } else {
            assert!(
                (shard as usize) < self.core.staging.len(),
                "destination shard {shard} out of range"
            );
            self.core.stats.record_sent_remote();
            envelope::push_event(
                &mut self.core.staging[shard as usize],
                source,
                dest,
                0,
                event,
                self.core.max_inline,
            )
        };
        unsafe { &mut *ptr }
    }
}
