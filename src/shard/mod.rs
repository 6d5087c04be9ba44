//! The per-shard engine: actor slots, the tick loop, inbound drain, local
//! dispatch, and outbound flush.
//!
//! Internal to the crate: applications interact with shards through
//! [`Runtime`](crate::system::Runtime) and
//! [`ActorContext`](crate::actor::ActorContext).

pub(crate) mod core;
pub(crate) mod engine;
