//! The per-shard reactor: kernel readiness, timers, deferred callbacks.
//!
//! The reactor never invokes actor code. Readiness and expiry are
//! translated into typed events appended to the shard inbox, and deferred
//! closures are queued for the engine to run between the poll and the
//! dispatch walk. This keeps every piece of activity on a shard flowing
//! through the one dispatch path.

// Layer 1: Standard library imports
use std::io;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use mio::event::Source;
use mio::{Events, Interest, Poll, Token};
use slab::Slab;

// Layer 3: Internal module imports
use super::error::ReactorError;
use super::events::{Disconnected, IoToken, Readable, TimerFired, TimerId, Writable};
use super::timer::{Callback, TimerTarget, TimerWheel};
use crate::event::envelope;
use crate::pipe::LocalPipe;
use crate::util::ActorId;

/// Poll event batch size.
const EVENTS_CAPACITY: usize = 1024;

struct Watcher {
    actor: ActorId,
}

/// Per-shard event multiplexer.
pub struct Reactor {
    poll: Poll,
    events: Events,
    watchers: Slab<Watcher>,
    timers: TimerWheel,
    /// Closures due this tick (from `defer(0)` and expired timer slots).
    due_callbacks: Vec<Callback>,
    max_inline: usize,
}

impl Reactor {
    pub(crate) fn new(granularity: Duration, max_inline: usize) -> Result<Self, ReactorError> {
        let poll = Poll::new().map_err(ReactorError::Init)?;
        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            watchers: Slab::new(),
            timers: TimerWheel::new(granularity),
            due_callbacks: Vec::new(),
            max_inline,
        })
    }

    /// Register `source` for `interest`; readiness is delivered to `actor`
    /// as [`Readable`]/[`Writable`]/[`Disconnected`] events.
    pub fn watch<S: Source + ?Sized>(
        &mut self,
        source: &mut S,
        actor: ActorId,
        interest: Interest,
    ) -> Result<IoToken, ReactorError> {
        let entry = self.watchers.vacant_entry();
        let token = entry.key();
        self.poll
            .registry()
            .register(source, Token(token), interest)
            .map_err(ReactorError::Registration)?;
        entry.insert(Watcher { actor });
        Ok(IoToken(token))
    }

    /// Change the interest set of an existing watcher.
    pub fn rearm<S: Source + ?Sized>(
        &mut self,
        token: IoToken,
        source: &mut S,
        interest: Interest,
    ) -> Result<(), ReactorError> {
        if !self.watchers.contains(token.0) {
            return Err(ReactorError::UnknownToken(token.0));
        }
        self.poll
            .registry()
            .reregister(source, Token(token.0), interest)
            .map_err(ReactorError::Registration)
    }

    /// Cancel a watcher. Synchronous: no further events are produced for
    /// the token, though events already enqueued this tick may still be
    /// walked and must be treated as stale by the owner.
    pub fn unwatch<S: Source + ?Sized>(
        &mut self,
        token: IoToken,
        source: &mut S,
    ) -> Result<(), ReactorError> {
        if self.watchers.try_remove(token.0).is_none() {
            return Err(ReactorError::UnknownToken(token.0));
        }
        self.poll
            .registry()
            .deregister(source)
            .map_err(ReactorError::Registration)
    }

    /// Schedule a timer for `actor`; periodic when `period` is set.
    pub fn schedule(
        &mut self,
        actor: ActorId,
        after: Duration,
        period: Option<Duration>,
    ) -> TimerId {
        self.timers
            .schedule(Instant::now(), after, period, TimerTarget::Actor(actor))
    }

    /// Cancel a timer before (or between) firings.
    pub fn cancel(&mut self, timer: TimerId) {
        self.timers.cancel(timer);
    }

    /// Queue `f` to run on this shard after `delay`. A zero delay runs it
    /// on the current tick, before the reactor can block again.
    pub fn defer(&mut self, delay: Duration, f: Callback) {
        if delay.is_zero() {
            self.due_callbacks.push(f);
        } else {
            self.timers
                .schedule(Instant::now(), delay, None, TimerTarget::Callback(f));
        }
    }

    /// One reactor pass: block on the kernel for at most `timeout`, then
    /// translate readiness and expired timers into inbox events.
    pub(crate) fn run_once(
        &mut self,
        timeout: Option<Duration>,
        shard_inbox: &mut LocalPipe,
    ) -> Result<(), ReactorError> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ReactorError::Poll(e)),
        }
        for event in self.events.iter() {
            let Some(watcher) = self.watchers.get(event.token().0) else {
                // Cancelled while the batch was in flight.
                continue;
            };
            let token = IoToken(event.token().0);
            let actor = watcher.actor;
            if event.is_error() {
                envelope::push_event(
                    shard_inbox,
                    ActorId::NULL,
                    actor,
                    0,
                    Disconnected { token },
                    self.max_inline,
                );
                continue;
            }
            if event.is_readable() || event.is_read_closed() {
                envelope::push_event(
                    shard_inbox,
                    ActorId::NULL,
                    actor,
                    0,
                    Readable { token },
                    self.max_inline,
                );
            }
            if event.is_writable() {
                envelope::push_event(
                    shard_inbox,
                    ActorId::NULL,
                    actor,
                    0,
                    Writable { token },
                    self.max_inline,
                );
            }
        }
        self.advance_timers(Instant::now(), shard_inbox);
        Ok(())
    }

    fn advance_timers(&mut self, now: Instant, shard_inbox: &mut LocalPipe) {
        let Self {
            timers,
            due_callbacks,
            max_inline,
            ..
        } = self;
        let max_inline = *max_inline;
        timers.advance(
            now,
            |actor, timer| {
                envelope::push_event(
                    shard_inbox,
                    ActorId::NULL,
                    actor,
                    0,
                    TimerFired { timer },
                    max_inline,
                );
            },
            |cb| due_callbacks.push(cb),
        );
    }

    /// Take the callbacks due this tick.
    pub(crate) fn take_callbacks(&mut self) -> Vec<Callback> {
        std::mem::take(&mut self.due_callbacks)
    }

    /// True when `defer(0)` work is queued; the engine must not block.
    pub(crate) fn has_due_callbacks(&self) -> bool {
        !self.due_callbacks.is_empty()
    }

    /// Earliest live timer deadline.
    pub(crate) fn next_timer_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Wheel granularity, for deadline arithmetic in the engine.
    pub fn granularity(&self) -> Duration {
        self.timers.granularity()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::event::envelope::read_header;
    use crate::event::type_id_of;

    fn drain_type_ids(inbox: &mut LocalPipe) -> Vec<u32> {
        let mut out = Vec::new();
        let mut off = 0;
        while off < inbox.len_bytes() {
            let header = unsafe { read_header(inbox.base_mut().add(off)) };
            out.push(header.type_id);
            off += header.bucket_bytes();
        }
        envelope::release_all(inbox);
        out
    }

    #[test]
    fn test_poll_with_zero_timeout_is_nonblocking() {
        let mut reactor = Reactor::new(Duration::from_millis(10), 1 << 20).unwrap();
        let mut inbox = LocalPipe::new();
        let started = Instant::now();
        reactor
            .run_once(Some(Duration::ZERO), &mut inbox)
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_listener_readiness_becomes_readable_event() {
        let mut reactor = Reactor::new(Duration::from_millis(10), 1 << 20).unwrap();
        let mut inbox = LocalPipe::new();
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut listener = mio::net::TcpListener::bind(addr).unwrap();
        let local = listener.local_addr().unwrap();
        let actor = ActorId::new(1, 0);
        reactor
            .watch(&mut listener, actor, Interest::READABLE)
            .unwrap();

        // A connecting peer makes the listener readable.
        let _client = std::net::TcpStream::connect(local).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut ids = Vec::new();
        while ids.is_empty() && Instant::now() < deadline {
            reactor
                .run_once(Some(Duration::from_millis(50)), &mut inbox)
                .unwrap();
            ids = drain_type_ids(&mut inbox);
        }
        assert!(ids.contains(&type_id_of::<Readable>()));
    }

    #[test]
    fn test_unwatch_suppresses_future_events() {
        let mut reactor = Reactor::new(Duration::from_millis(10), 1 << 20).unwrap();
        let mut inbox = LocalPipe::new();
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut listener = mio::net::TcpListener::bind(addr).unwrap();
        let local = listener.local_addr().unwrap();
        let token = reactor
            .watch(&mut listener, ActorId::new(1, 0), Interest::READABLE)
            .unwrap();
        reactor.unwatch(token, &mut listener).unwrap();

        let _client = std::net::TcpStream::connect(local).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        reactor
            .run_once(Some(Duration::from_millis(50)), &mut inbox)
            .unwrap();
        assert!(drain_type_ids(&mut inbox).is_empty());
    }

    #[test]
    fn test_timer_event_lands_in_inbox() {
        let mut reactor = Reactor::new(Duration::from_millis(5), 1 << 20).unwrap();
        let mut inbox = LocalPipe::new();
        let actor = ActorId::new(9, 0);
        reactor.schedule(actor, Duration::from_millis(10), None);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut ids = Vec::new();
        while ids.is_empty() && Instant::now() < deadline {
            reactor
                .run_once(Some(Duration::from_millis(10)), &mut inbox)
                .unwrap();
            let mut off = 0;
            while off < inbox.len_bytes() {
                let header = unsafe { read_header(inbox.base_mut().add(off)) };
                assert_eq!(header.dest, actor);
                ids.push(header.type_id);
                off += header.bucket_bytes();
            }
            envelope::release_all(&mut inbox);
        }
        assert_eq!(ids, vec![type_id_of::<TimerFired>()]);
    }

    #[test]
    fn test_defer_zero_is_due_immediately() {
        let mut reactor = Reactor::new(Duration::from_millis(10), 1 << 20).unwrap();
        reactor.defer(Duration::ZERO, Box::new(|_| {}));
        assert!(reactor.has_due_callbacks());
        assert_eq!(reactor.take_callbacks().len(), 1);
        assert!(!reactor.has_due_callbacks());
    }

    #[test]
    fn test_deferred_with_delay_goes_through_wheel() {
        let mut reactor = Reactor::new(Duration::from_millis(5), 1 << 20).unwrap();
        let mut inbox = LocalPipe::new();
        reactor.defer(Duration::from_millis(10), Box::new(|_| {}));
        assert!(!reactor.has_due_callbacks());
        let deadline = Instant::now() + Duration::from_secs(5);
        while !reactor.has_due_callbacks() && Instant::now() < deadline {
            reactor
                .run_once(Some(Duration::from_millis(10)), &mut inbox)
                .unwrap();
        }
        assert_eq!(reactor.take_callbacks().len(), 1);
    }

    #[test]
    fn test_rearm_unknown_token_fails() {
        let mut reactor = Reactor::new(Duration::from_millis(10), 1 << 20).unwrap();
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut listener = mio::net::TcpListener::bind(addr).unwrap();
        let err = reactor
            .rearm(IoToken(42), &mut listener, Interest::READABLE)
            .unwrap_err();
        assert!(matches!(err, ReactorError::UnknownToken(42)));
    }
}
