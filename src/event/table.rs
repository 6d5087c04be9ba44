//! Per-actor handler table: dense `type_id -> thunk` with hash overflow.

// Layer 1: Standard library imports
use std::any::Any;
use std::collections::HashMap;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::traits::Event;
use crate::actor::{ActorContext, Handle};

/// Handler thunk: downcasts the actor, reads the payload by value, and
/// invokes the registered `Handle<E>::on` method.
///
/// # Safety contract
/// `payload` must point at a valid, owned value of the event type the thunk
/// was instantiated for; the thunk consumes it exactly once (moved into the
/// handler, or dropped on a failed actor downcast).
pub(crate) type HandlerFn = unsafe fn(&mut dyn Any, &mut ActorContext<'_>, *mut u8);

/// Tick thunk stored per actor for periodic callbacks.
pub(crate) type TickFn = fn(&mut dyn Any, &mut ActorContext<'_>);

/// Outcome of a table insert, used for duplicate-handler diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registered {
    /// First registration for this type id.
    Fresh,
    /// Same thunk registered again; a no-op.
    Same,
    /// A different thunk replaced the previous one.
    Replaced,
}

/// Type ids below this bound use the dense vector; the long tail goes to
/// the overflow map.
const DENSE_LIMIT: usize = 256;

/// Dispatch table owned by a single actor.
///
/// Lookups are a bounds check and an index for the common (low type id)
/// case; rarely-used types fall back to a `HashMap`.
#[derive(Default)]
pub(crate) struct EventTable {
    dense: Vec<Option<HandlerFn>>,
    overflow: HashMap<u32, HandlerFn>,
}

impl EventTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, type_id: u32, thunk: HandlerFn) -> Registered {
        match self.get(type_id) {
            Some(existing) if existing as usize == thunk as usize => Registered::Same,
            Some(_) => {
                self.set(type_id, thunk);
                Registered::Replaced
            }
            None => {
                self.set(type_id, thunk);
                Registered::Fresh
            }
        }
    }

    pub(crate) fn remove(&mut self, type_id: u32) -> bool {
        let idx = type_id as usize;
        if idx < DENSE_LIMIT {
            if idx < self.dense.len() {
                return self.dense[idx].take().is_some();
            }
            false
        } else {
            self.overflow.remove(&type_id).is_some()
        }
    }

    #[inline]
    pub(crate) fn get(&self, type_id: u32) -> Option<HandlerFn> {
        let idx = type_id as usize;
        if idx < DENSE_LIMIT {
            self.dense.get(idx).copied().flatten()
        } else {
            self.overflow.get(&type_id).copied()
        }
    }

    fn set(&mut self, type_id: u32, thunk: HandlerFn) {
        let idx = type_id as usize;
        if idx < DENSE_LIMIT {
            if idx >= self.dense.len() {
                self.dense.resize(idx + 1, None);
            }
            self.dense[idx] = Some(thunk);
        } else {
            self.overflow.insert(type_id, thunk);
        }
    }
}

/// The one generic-to-erased bridge in the dispatch path.
pub(crate) unsafe fn handler_thunk<A, E>(
    actor: &mut dyn Any,
    ctx: &mut ActorContext<'_>,
    payload: *mut u8,
) where
    A: Handle<E>,
    E: Event,
{
    let Some(actor) = actor.downcast_mut::<A>() else {
        // Registered against a different actor type; the payload still has
        // to be consumed exactly once.
        std::ptr::drop_in_place(payload as *mut E);
        tracing::warn!(event = E::NAME, "handler thunk target mismatch, event dropped");
        return;
    };
    let event = (payload as *mut E).read();
    actor.on(ctx, event);
}

/// Instantiate the erased tick thunk for an actor type.
pub(crate) fn tick_thunk<A: crate::actor::Tick>(actor: &mut dyn Any, ctx: &mut ActorContext<'_>) {
    if let Some(actor) = actor.downcast_mut::<A>() {
        actor.on_tick(ctx);
    }
}
