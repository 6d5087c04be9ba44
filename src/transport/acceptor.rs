//! Listening actor: binds, accepts until `WouldBlock`, and hands sockets
//! to an io-handler actor.

// Layer 1: Standard library imports
use std::io;

// Layer 2: Third-party crate imports
use mio::net::TcpListener;
use mio::Interest;

// Layer 3: Internal module imports
use super::events::{Listening, NewConnection};
use super::uri::{Scheme, Uri};
use crate::actor::{Actor, ActorContext, Handle};
use crate::reactor::{IoToken, Readable};
use crate::util::ActorId;

/// Accepts TCP connections on a bound uri and forwards each accepted
/// socket to `handler` as a [`NewConnection`] event. The handler may live
/// on any shard.
///
/// On a successful bind the handler first receives a [`Listening`] event
/// with the effective local address.
///
/// # Example
/// ```rust,ignore
/// let server = rt.add_actor(0, EchoServer::new())?;
/// rt.add_actor(0, Acceptor::new("tcp://127.0.0.1:0".parse()?, server))?;
/// ```
pub struct Acceptor {
    uri: Uri,
    handler: ActorId,
    listener: Option<TcpListener>,
    token: Option<IoToken>,
}

impl Acceptor {
    pub fn new(uri: Uri, handler: ActorId) -> Self {
        Self {
            uri,
            handler,
            listener: None,
            token: None,
        }
    }

    fn bind(&self) -> io::Result<TcpListener> {
        let addrs = self.uri.socket_addrs()?;
        let mut last = io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses");
        for addr in addrs {
            match TcpListener::bind(addr) {
                Ok(listener) => return Ok(listener),
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}

impl Actor for Acceptor {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        if self.uri.scheme == Scheme::Udp {
            tracing::error!(uri = %self.uri, "acceptor requires a stream scheme");
            return false;
        }
        let mut listener = match self.bind() {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(uri = %self.uri, error = %e, "bind failed");
                return false;
            }
        };
        let local = match listener.local_addr() {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(uri = %self.uri, error = %e, "local_addr failed");
                return false;
            }
        };
        match ctx.watch(&mut listener, Interest::READABLE) {
            Ok(token) => self.token = Some(token),
            Err(e) => {
                tracing::error!(uri = %self.uri, error = %e, "listener watch failed");
                return false;
            }
        }
        self.listener = Some(listener);
        ctx.register_event::<Readable, Self>();
        ctx.push(self.handler, Listening { addr: local });
        tracing::debug!(uri = %self.uri, addr = %local, "accepting");
        true
    }

    fn on_stop(&mut self, ctx: &mut ActorContext<'_>) {
        if let (Some(token), Some(listener)) = (self.token.take(), self.listener.as_mut()) {
            let _ = ctx.unwatch(token, listener);
        }
    }
}

impl Handle<Readable> for Acceptor {
    fn on(&mut self, ctx: &mut ActorContext<'_>, _event: Readable) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };
        loop {
            match listener.accept() {
                Ok((socket, peer)) => {
                    ctx.push(self.handler, NewConnection { socket, peer });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(uri = %self.uri, error = %e, "accept failed");
                    break;
                }
            }
        }
    }
}
