//! One-stop imports for application actors.
//!
//! ```rust
//! use coreactor::prelude::*;
//! ```

pub use crate::actor::{Actor, ActorContext, Handle, Tick};
pub use crate::event::{Backpressure, Event, KillEvent};
pub use crate::protocol::{Delimited, LengthPrefix, Protocol, ProtocolError};
pub use crate::reactor::{
    Disconnected, Interest, IoToken, Readable, TimerFired, TimerId, Writable,
};
pub use crate::session::{CloseReason, Session, SessionClosed, SessionDriver, SessionLink};
pub use crate::system::{Runtime, RuntimeConfig, StopHandle, SystemError};
pub use crate::transport::{
    connect, Acceptor, ConnectResult, Listening, NewConnection, Scheme, Uri,
};
pub use crate::util::{ActorId, ActorIdList, BroadcastId};
