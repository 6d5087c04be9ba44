//! Events produced by the transport actors.

// Layer 1: Standard library imports
use std::net::SocketAddr;

// Layer 2: Third-party crate imports
use mio::net::TcpStream;

// Layer 3: Internal module imports
use crate::event::Event;

/// An accepted connection, carrying the socket by move.
///
/// Sent by [`Acceptor`](super::Acceptor) to its io-handler actor, which
/// typically wraps the socket in a [`Session`](crate::session::Session)
/// spawned on its own shard.
#[derive(Debug)]
pub struct NewConnection {
    pub socket: TcpStream,
    pub peer: SocketAddr,
}

impl Event for NewConnection {
    const NAME: &'static str = "new_connection";
}

/// The listener is bound and accepting.
///
/// Carries the actual local address, which matters when binding port 0.
#[derive(Debug, Clone, Copy)]
pub struct Listening {
    pub addr: SocketAddr,
}

impl Event for Listening {
    const NAME: &'static str = "listening";
}

/// Completion of an asynchronous connect started with
/// [`connect`](super::connect): an opened socket, or `None` on refusal,
/// error, or timeout.
#[derive(Debug)]
pub struct ConnectResult {
    pub socket: Option<TcpStream>,
    pub peer: Option<SocketAddr>,
    /// The tag passed to `connect`, correlating concurrent attempts.
    pub tag: u64,
}

impl Event for ConnectResult {
    const NAME: &'static str = "connect_result";
}
