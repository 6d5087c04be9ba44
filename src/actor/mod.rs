//! The actor kernel: lifecycle traits, typed handlers, and the dispatch
//! context.
//!
//! # Components
//!
//! - [`Actor`] - Lifecycle (`on_init` / `on_stop`)
//! - [`Handle`] - Typed event handler, one impl per `(actor, event)` pair
//! - [`Tick`] - Periodic per-tick callback
//! - [`ActorContext`] - Sends, timers, watchers, and spawn, scoped to one
//!   dispatch
//!
//! # Design
//!
//! Handlers receive events by value and contexts by `&mut`, so an actor
//! can never retain a reference into the shard across dispatches; the
//! borrow checker enforces the cooperative-scheduling contract the runtime
//! depends on.

pub mod context;
pub mod traits;

pub(crate) use traits::AnyActor;

pub use context::ActorContext;
pub use traits::{Actor, Handle, Tick};
