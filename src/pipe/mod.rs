//! Event pipes: the lock-free SPSC cross-shard ring and the shard-local
//! staging buffer.
//!
//! # Components
//!
//! - [`channel`] - Build a producer/consumer pair for one ordered shard pair
//! - [`PipeProducer`] / [`PipeConsumer`] - The SPSC ring endpoints
//! - [`LocalPipe`] - Single-threaded grow-on-demand bucket buffer
//! - [`PipeError`] - Backpressure and capacity failures
//!
//! # Design
//!
//! An N-shard runtime owns N×(N−1) rings, one per ordered pair, which keeps
//! every ring single-producer single-consumer and makes per-pair FIFO a
//! structural property rather than a protocol. Progress is release/acquire
//! on two cache-line-separated indices; there are no locks anywhere on the
//! delivery path.

pub mod error;
pub mod local;
pub mod spsc;

pub use error::PipeError;
pub use local::LocalPipe;
pub use spsc::{channel, PipeConsumer, PipeProducer, MIN_CAPACITY};
