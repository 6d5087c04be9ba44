//! # coreactor - Shared-Nothing Actor Runtime
//!
//! A set of cooperatively-scheduled, single-threaded execution shards,
//! each pinned to an OS thread, hosting lightweight actors that
//! communicate exclusively by typed asynchronous events. Cross-shard
//! delivery rides lock-free SPSC byte rings; each shard embeds an I/O
//! reactor whose readiness and timer events are indistinguishable from
//! ordinary messages at the dispatch layer.
//!
//! # Quick Start
//!
//! ```rust
//! use coreactor::prelude::*;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone)]
//! struct Ping(u64);
//! impl Event for Ping {
//!     const NAME: &'static str = "ping";
//! }
//!
//! struct Counter {
//!     seen: Arc<AtomicU64>,
//! }
//!
//! impl Actor for Counter {
//!     fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
//!         ctx.register_event::<Ping, Self>();
//!         true
//!     }
//! }
//!
//! impl Handle<Ping> for Counter {
//!     fn on(&mut self, ctx: &mut ActorContext<'_>, event: Ping) {
//!         if self.seen.fetch_add(1, Ordering::Relaxed) + 1 == 100 {
//!             ctx.kill();
//!         }
//!         let _ = event.0;
//!     }
//! }
//!
//! struct Pinger {
//!     dest: ActorId,
//! }
//!
//! impl Actor for Pinger {
//!     fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
//!         for n in 0..100 {
//!             ctx.push(self.dest, Ping(n));
//!         }
//!         true
//!     }
//! }
//!
//! fn main() {
//!     let seen = Arc::new(AtomicU64::new(0));
//!     let mut rt = Runtime::new(2);
//!     let counter = rt.add_actor(0, Counter { seen: Arc::clone(&seen) }).unwrap();
//!     rt.add_actor(1, Pinger { dest: counter }).unwrap();
//!     rt.start(false).unwrap();
//!     while seen.load(Ordering::Relaxed) < 100 {
//!         std::thread::yield_now();
//!     }
//!     rt.stop();
//!     rt.join();
//!     assert!(!rt.has_error());
//! }
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`actor`] - Actor traits, typed handlers, and the dispatch context
//! - [`event`] - Envelope layout, type registry, runtime events
//! - [`pipe`] - Lock-free SPSC rings and the shard-local buffer
//! - [`system`] - Runtime supervisor, configuration, signals
//!
//! ## I/O
//! - [`reactor`] - Per-shard poller, timer wheel, deferred callbacks
//! - [`transport`] - Uris, accept, asynchronous connect, datagrams
//! - [`protocol`] - Byte-stream framing strategies
//! - [`session`] - Connection-owning actors
//!
//! ## Support
//! - [`stats`] - Per-shard counters
//! - [`util`] - Actor identity
//!
//! # Scheduling Model
//!
//! N shards tick independently; a tick drains the reactor, the inbound
//! rings from every peer shard, the periodic hooks, and the local inbox,
//! then flushes outbound staging. Nothing preempts a handler: long CPU
//! work must be chunked through
//! [`ActorContext::callback`](actor::ActorContext::callback). The reactor
//! is the only blocking point, and only on an otherwise idle shard.
//!
//! # Ordering Guarantees
//!
//! - Same-shard sends: strict FIFO.
//! - Cross-shard sends: strict FIFO per (source, destination) shard pair.
//! - No ordering across pairs; broadcast is FIFO relative to other sends
//!   from the same source shard.
//!
//! # Relocatability
//!
//! Events move between shards by byte copy, which is Rust move semantics:
//! any `Send + 'static` payload is safe, including heap-owning types,
//! whose destructor then runs on the consuming shard (or wherever the
//! runtime drops an undeliverable event). Payloads larger than the inline
//! bucket bound, or with alignment above 8, travel boxed.

pub mod actor;
pub mod event;
pub mod pipe;
pub mod prelude;
pub mod protocol;
pub mod reactor;
pub mod session;
pub(crate) mod shard;
pub mod stats;
pub mod system;
pub mod transport;
pub mod util;

// Re-export the surface most applications touch.
pub use actor::{Actor, ActorContext, Handle, Tick};
pub use event::{Backpressure, Event, KillEvent};
pub use reactor::{Disconnected, Interest, IoToken, Readable, TimerFired, TimerId, Writable};
pub use session::{CloseReason, Session, SessionClosed, SessionDriver, SessionLink};
pub use system::{Runtime, RuntimeConfig, StopHandle, SystemError};
pub use transport::{Acceptor, ConnectResult, Listening, NewConnection, Uri};
pub use util::{ActorId, ActorIdList, BroadcastId};
