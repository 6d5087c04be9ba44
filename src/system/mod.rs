//! Process-wide lifecycle: configuration, the runtime supervisor, shard
//! staging, and signal-driven stop.
//!
//! # Components
//!
//! - [`Runtime`] - Shard spawn, barrier-synchronised start, stop, join
//! - [`RuntimeConfig`] - Tick, pipe, timer, and drain tuning
//! - [`ShardBuilder`] - Fluent multi-actor staging per shard
//! - [`StopHandle`] - Lock-free stop from any thread
//! - [`SystemError`] - Construction and lifecycle failures

pub mod builder;
pub mod config;
pub mod errors;
pub mod runtime;
pub(crate) mod signal;

pub use builder::ShardBuilder;
pub use config::{RuntimeConfig, RuntimeConfigBuilder};
pub use errors::SystemError;
pub use runtime::{Runtime, StopHandle};
