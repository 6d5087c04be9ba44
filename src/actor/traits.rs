//! Actor traits: lifecycle, typed handlers, and the periodic tick hook.

// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::context::ActorContext;
use crate::event::Event;

/// An actor: private state plus behaviour, scheduled on exactly one shard.
///
/// Actors never share memory; they hold [`ActorId`](crate::util::ActorId)
/// values and send events. The hosting shard owns the actor and is the
/// only thread that ever touches it, so implementations need `Send` (for
/// the hand-off to the shard thread) but never any synchronisation.
///
/// Handlers are registered per event type by implementing [`Handle`] and
/// calling [`ActorContext::register_event`] from [`on_init`](Actor::on_init).
///
/// # Example
/// ```rust
/// use coreactor::prelude::*;
///
/// #[derive(Debug, Clone)]
/// struct Greet;
/// impl Event for Greet {
///     const NAME: &'static str = "greet";
/// }
///
/// struct Greeter {
///     seen: u64,
/// }
///
/// impl Actor for Greeter {
///     fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
///         ctx.register_event::<Greet, Self>();
///         true
///     }
/// }
///
/// impl Handle<Greet> for Greeter {
///     fn on(&mut self, _ctx: &mut ActorContext<'_>, _event: Greet) {
///         self.seen += 1;
///     }
/// }
/// ```
pub trait Actor: Send + 'static {
    /// Called exactly once, on the owning shard, before the actor receives
    /// any event. Returning `false` aborts construction: the actor is
    /// dropped and its id never becomes live.
    fn on_init(&mut self, _ctx: &mut ActorContext<'_>) -> bool {
        true
    }

    /// Called when the actor is reaped, either after
    /// [`kill`](ActorContext::kill) or during shard shutdown.
    fn on_stop(&mut self, _ctx: &mut ActorContext<'_>) {}
}

/// Typed event handler. One implementation per `(actor, event)` pair.
///
/// The event arrives by value: the handler owns it, and the payload's
/// destructor runs exactly once whether or not a handler exists.
pub trait Handle<E: Event>: Actor + Sized {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: E);
}

/// Periodic callback hook, invoked at most once per shard tick, between
/// the inbound drain and the local dispatch walk.
///
/// Registered with [`ActorContext::register_tick`]; long CPU work belongs
/// in chunks behind [`ActorContext::callback`] instead, since the shard
/// never preempts.
pub trait Tick: Actor + Sized {
    fn on_tick(&mut self, ctx: &mut ActorContext<'_>);
}

/// Object-safe bridge from `Box<dyn _>` actor storage back to `Any` for
/// thunk downcasts.
pub(crate) trait AnyActor: Actor {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<A: Actor> AnyActor for A {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
