//! Small shared utilities: actor identity and id batches.

pub mod ids;

pub use ids::{ActorId, ActorIdList, BroadcastId};
