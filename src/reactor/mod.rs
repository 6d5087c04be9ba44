//! Per-shard I/O reactor: kernel readiness, a hashed timer wheel, and a
//! deferred-callback queue.
//!
//! # Components
//!
//! - [`Reactor`] - Poller + watchers + timers for one shard
//! - [`Readable`], [`Writable`], [`Disconnected`], [`TimerFired`] - The
//!   typed events readiness is translated into
//! - [`IoToken`], [`TimerId`] - Watcher and timer handles
//! - [`ReactorError`] - Creation and registration failures
//!
//! # Design
//!
//! The reactor is the only place a shard blocks, and only when it has no
//! other work; the engine computes the sleep deadline from the next timer.
//! Actor code never runs inside the reactor: everything it produces is an
//! event on the shard inbox, dispatched by the same walk as any other
//! message.

pub mod error;
pub mod events;
pub mod poll;
pub mod timer;

pub use error::ReactorError;
pub use mio::Interest;
pub use events::{Disconnected, IoToken, Readable, TimerFired, TimerId, Writable};
pub use poll::Reactor;
pub use timer::{Callback, DEFAULT_GRANULARITY};
