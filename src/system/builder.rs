//! Fluent multi-actor staging for one shard.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::errors::SystemError;
use super::runtime::Runtime;
use crate::actor::Actor;
use crate::util::ActorIdList;

/// Stages a batch of actors on a single shard, collecting their ids.
///
/// The first failure is remembered and returned from
/// [`ids`](ShardBuilder::ids); later `with_actor` calls become no-ops.
///
/// # Examples
///
/// ```rust
/// use coreactor::prelude::*;
///
/// struct Worker;
/// impl Actor for Worker {}
///
/// let mut rt = Runtime::new(2);
/// let ids = rt.shard(1)
///     .with_actor(Worker)
///     .with_actor(Worker)
///     .ids()
///     .unwrap();
/// assert_eq!(ids.len(), 2);
/// assert!(ids.iter().all(|id| id.shard_index() == 1));
/// ```
pub struct ShardBuilder<'a> {
    runtime: &'a mut Runtime,
    shard: u16,
    ids: ActorIdList,
    error: Option<SystemError>,
}

impl<'a> ShardBuilder<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, shard: u16) -> Self {
        Self {
            runtime,
            shard,
            ids: ActorIdList::new(),
            error: None,
        }
    }

    /// Stage one more actor on the shard.
    pub fn with_actor<A: Actor>(mut self, actor: A) -> Self {
        if self.error.is_none() {
            match self.runtime.add_actor(self.shard, actor) {
                Ok(id) => self.ids.push(id),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// The staged ids, or the first staging failure.
    pub fn ids(self) -> Result<ActorIdList, SystemError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.ids),
        }
    }
}
