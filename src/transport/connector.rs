//! Asynchronous connect, implemented as a transient framework actor.
//!
//! [`connect`] spawns a [`Connector`] on the caller's shard. The connector
//! owns the in-flight socket, waits for writability (the kernel's connect
//! completion signal), and delivers exactly one [`ConnectResult`] to the
//! requester before killing itself.

// Layer 1: Standard library imports
use std::net::SocketAddr;
use std::time::Duration;

// Layer 2: Third-party crate imports
use mio::net::TcpStream;
use mio::Interest;

// Layer 3: Internal module imports
use super::error::TransportError;
use super::events::ConnectResult;
use super::uri::Uri;
use crate::actor::{Actor, ActorContext, Handle};
use crate::reactor::{Disconnected, IoToken, TimerFired, Writable};
use crate::system::SystemError;
use crate::util::ActorId;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Start an asynchronous connect to `uri` on the calling actor's shard.
///
/// Completion (success, refusal, or timeout) arrives at the calling actor
/// as a single [`ConnectResult`] event carrying `tag`; register a handler
/// for it before calling. Name resolution happens here and may block
/// briefly for non-literal hosts.
pub fn connect(
    ctx: &mut ActorContext<'_>,
    uri: &Uri,
    timeout: Duration,
    tag: u64,
) -> Result<(), TransportError> {
    let addr = uri
        .socket_addrs()
        .map_err(|_| TransportError::Resolve(uri.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::Resolve(uri.to_string()))?;
    let reply_to = ctx.id();
    match ctx.spawn(Connector {
        addr,
        reply_to,
        tag,
        timeout,
        socket: None,
        token: None,
        done: false,
    }) {
        Ok(_) => Ok(()),
        // A declined connector already delivered its failure result.
        Err(SystemError::ActorInitFailed(_)) => Ok(()),
        Err(e) => Err(TransportError::Spawn(e.to_string())),
    }
}

pub(crate) struct Connector {
    addr: SocketAddr,
    reply_to: ActorId,
    tag: u64,
    timeout: Duration,
    socket: Option<TcpStream>,
    token: Option<IoToken>,
    done: bool,
}

impl Connector {
    fn finish(&mut self, ctx: &mut ActorContext<'_>, socket: Option<TcpStream>) {
        if self.done {
            return;
        }
        self.done = true;
        let peer = socket.as_ref().and_then(|s| s.peer_addr().ok());
        ctx.push(
            self.reply_to,
            ConnectResult {
                socket,
                peer,
                tag: self.tag,
            },
        );
        ctx.kill();
    }

    fn take_watched(&mut self, ctx: &mut ActorContext<'_>) -> Option<TcpStream> {
        let mut socket = self.socket.take()?;
        if let Some(token) = self.token.take() {
            let _ = ctx.unwatch(token, &mut socket);
        }
        Some(socket)
    }
}

impl Actor for Connector {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        let mut socket = match TcpStream::connect(self.addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(addr = %self.addr, error = %e, "connect failed to start");
                self.finish(ctx, None);
                return false;
            }
        };
        match ctx.watch(&mut socket, Interest::WRITABLE) {
            Ok(token) => self.token = Some(token),
            Err(e) => {
                tracing::error!(addr = %self.addr, error = %e, "connect watch failed");
                self.finish(ctx, None);
                return false;
            }
        }
        self.socket = Some(socket);
        ctx.register_event::<Writable, Self>();
        ctx.register_event::<Disconnected, Self>();
        ctx.register_event::<TimerFired, Self>();
        ctx.set_timer(self.timeout, None);
        true
    }
}

impl Handle<Writable> for Connector {
    fn on(&mut self, ctx: &mut ActorContext<'_>, _event: Writable) {
        if self.done {
            return;
        }
        let Some(mut socket) = self.take_watched(ctx) else {
            return;
        };
        // Writability signals completion; the error state tells success
        // from refusal.
        let failed = matches!(socket.take_error(), Ok(Some(_)) | Err(_))
            || socket.peer_addr().is_err();
        if failed {
            self.finish(ctx, None);
        } else {
            self.finish(ctx, Some(socket));
        }
    }
}

impl Handle<Disconnected> for Connector {
    fn on(&mut self, ctx: &mut ActorContext<'_>, _event: Disconnected) {
        let _ = self.take_watched(ctx);
        self.finish(ctx, None);
    }
}

impl Handle<TimerFired> for Connector {
    fn on(&mut self, ctx: &mut ActorContext<'_>, _event: TimerFired) {
        if !self.done {
            tracing::debug!(addr = %self.addr, "connect timed out");
            let _ = self.take_watched(ctx);
            self.finish(ctx, None);
        }
    }
}
