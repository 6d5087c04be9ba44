//! Transport primitives: uris, accept, asynchronous connect, datagrams,
//! and the byte-stream transform seam.
//!
//! # Components
//!
//! - [`Uri`] / [`Scheme`] - `tcp://`, `udp://`, `tcps://` endpoints
//! - [`Acceptor`] - Listening actor handing sockets to an io-handler
//! - [`connect`] / [`ConnectResult`] - Asynchronous connect with timeout
//! - [`UdpEndpoint`] - Nonblocking datagram socket
//! - [`Transform`] / [`Identity`] - TLS/compression attachment point
//!
//! # Design
//!
//! Transport is actors all the way down: the acceptor and the transient
//! connector are ordinary actors whose I/O readiness arrives as events,
//! and accepted sockets travel to their io-handler inside an event, even
//! across shards.

pub mod acceptor;
pub mod connector;
pub mod error;
pub mod events;
pub mod transform;
pub mod udp;
pub mod uri;

pub use acceptor::Acceptor;
pub use connector::{connect, DEFAULT_CONNECT_TIMEOUT};
pub use error::TransportError;
pub use events::{ConnectResult, Listening, NewConnection};
pub use transform::{Identity, Transform};
pub use udp::UdpEndpoint;
pub use uri::{Scheme, Uri, UriError};
