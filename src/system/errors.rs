//! Runtime-level error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::reactor::ReactorError;
use crate::util::ActorId;

/// Errors surfaced by the runtime supervisor and actor construction.
#[derive(Error, Debug)]
pub enum SystemError {
    /// `on_init` returned false; the actor was dropped.
    #[error("actor {0} failed to initialise")]
    ActorInitFailed(ActorId),

    /// The shard has no free service ids left.
    #[error("shard {shard} is hosting the maximum number of actors")]
    ShardFull { shard: u16 },

    /// A shard index outside the configured range.
    #[error("shard {shard} out of range (runtime has {shards} shards)")]
    InvalidShard { shard: u16, shards: u16 },

    /// Pre-start staging APIs called after `start`.
    #[error("runtime already started")]
    AlreadyStarted,

    /// A shard could not bring up its reactor.
    #[error("reactor initialisation failed: {0}")]
    Reactor(#[from] ReactorError),

    /// An OS thread for a shard could not be spawned.
    #[error("failed to spawn shard thread: {0}")]
    SpawnFailed(String),

    /// Installing the process signal handlers failed.
    #[error("failed to install signal handlers: {0}")]
    SignalInstall(String),

    /// Configuration validation failed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SystemError {
    /// Errors that leave the runtime unable to start or continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SystemError::Reactor(_) | SystemError::SpawnFailed(_) | SystemError::Config(_)
        )
    }

    /// Errors scoped to a single actor; the runtime itself is unaffected.
    pub fn is_actor_scoped(&self) -> bool {
        matches!(
            self,
            SystemError::ActorInitFailed(_) | SystemError::ShardFull { .. }
        )
    }
}
