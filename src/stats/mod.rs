//! Lightweight per-shard observability counters.

pub mod counters;

pub use counters::{ShardStats, StatsSnapshot};
