//! Sessions: actors that own a transport endpoint and a protocol parser.
//!
//! # Components
//!
//! - [`Session`] - The framework actor binding socket + protocol + driver
//! - [`SessionDriver`] - Application logic for one connection
//! - [`SessionLink`] - Outbound half lent to driver callbacks
//! - [`SessionClosed`] / [`CloseReason`] - The exactly-once close
//!   notification to the owning io-handler
//!
//! # The io-handler pattern
//!
//! A server is an ordinary actor handling
//! [`NewConnection`](crate::transport::NewConnection) (spawning a
//! `Session` per socket) and [`SessionClosed`] (dropping its bookkeeping
//! for the session):
//!
//! ```rust,ignore
//! impl Handle<NewConnection> for EchoServer {
//!     fn on(&mut self, ctx: &mut ActorContext<'_>, event: NewConnection) {
//!         let session = Session::<EchoDriver>::new(
//!             event.socket,
//!             LengthPrefix::new(),
//!             EchoDriver::default(),
//!             ctx.id(),
//!         )
//!         .with_timeout(Duration::from_secs(30));
//!         if let Ok(id) = ctx.spawn(session) {
//!             self.sessions.insert(id);
//!         }
//!     }
//! }
//! ```

pub mod buffer;
pub mod driver;
pub mod tcp;

pub use buffer::IoBuf;
pub use driver::{CloseReason, SessionClosed, SessionDriver, SessionLink};
pub use tcp::Session;
