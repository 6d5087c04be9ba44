// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Identity of an actor in the runtime.
///
/// An `ActorId` packs a per-shard service id and the index of the shard that
/// hosts the actor into a single `u32`:
///
/// ```text
/// | service_id: u16 | shard_index: u16 |
/// ```
///
/// The hosting shard is the only shard permitted to construct, mutate, or
/// destroy the actor; everyone else treats the id as an opaque routing key.
/// A `service_id` of zero addresses *every* alive actor on the shard (see
/// [`ActorId::broadcast`]), and the all-zero value is the null id.
///
/// # Example
/// ```rust
/// use coreactor::util::ActorId;
///
/// let id = ActorId::new(7, 2);
/// assert_eq!(id.service_id(), 7);
/// assert_eq!(id.shard_index(), 2);
/// assert!(!id.is_broadcast());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(transparent)]
pub struct ActorId(u32);

impl ActorId {
    /// The null id. Never routes anywhere.
    pub const NULL: ActorId = ActorId(0);

    /// Build an id from a service id and the hosting shard index.
    pub const fn new(service_id: u16, shard_index: u16) -> Self {
        Self(((service_id as u32) << 16) | shard_index as u32)
    }

    /// The broadcast id for a shard: delivered to every alive actor on it.
    pub const fn broadcast(shard_index: u16) -> Self {
        Self::new(0, shard_index)
    }

    /// Rebuild an id from its raw `u32` representation.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw `u32` representation (wire form of the envelope fields).
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The per-shard service id (zero means broadcast).
    pub const fn service_id(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// The index of the shard hosting the actor.
    pub const fn shard_index(self) -> u16 {
        self.0 as u16
    }

    /// True for ids whose `service_id` is zero.
    pub const fn is_broadcast(self) -> bool {
        self.0 >> 16 == 0
    }

    /// True for the all-zero null id.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            write!(f, "*@{}", self.shard_index())
        } else {
            write!(f, "{}@{}", self.service_id(), self.shard_index())
        }
    }
}

/// Convenience alias matching the broadcast constructor.
///
/// `BroadcastId(3)` reads better than `ActorId::broadcast(3)` at call sites
/// that fan an event out to a whole shard.
#[allow(non_snake_case)]
pub fn BroadcastId(shard_index: u16) -> ActorId {
    ActorId::broadcast(shard_index)
}

/// An ordered batch of actor ids, as produced by the shard builder.
///
/// # Example
/// ```rust
/// use coreactor::util::{ActorId, ActorIdList};
///
/// let mut list = ActorIdList::new();
/// list.push(ActorId::new(1, 0));
/// list.push(ActorId::new(2, 0));
/// assert_eq!(list.len(), 2);
/// assert_eq!(list[0].service_id(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorIdList(Vec<ActorId>);

impl ActorIdList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an id.
    pub fn push(&mut self, id: ActorId) {
        self.0.push(id);
    }

    /// Number of ids in the list.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the list holds no ids.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the ids in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ActorId> {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for ActorIdList {
    type Output = ActorId;

    fn index(&self, index: usize) -> &ActorId {
        &self.0[index]
    }
}

impl IntoIterator for ActorIdList {
    type Item = ActorId;
    type IntoIter = std::vec::IntoIter<ActorId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ActorIdList {
    type Item = &'a ActorId;
    type IntoIter = std::slice::Iter<'a, ActorId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<ActorId> for ActorIdList {
    fn from_iter<T: IntoIterator<Item = ActorId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
