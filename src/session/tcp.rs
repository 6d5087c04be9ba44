//! The session actor: socket + protocol + driver.

// Layer 1: Standard library imports
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use mio::net::TcpStream;
use mio::Interest;

// Layer 3: Internal module imports
use super::buffer::IoBuf;
use super::driver::{CloseReason, SessionClosed, SessionDriver, SessionLink};
use crate::actor::{Actor, ActorContext, Handle};
use crate::protocol::Protocol;
use crate::reactor::{Disconnected, IoToken, Readable, TimerFired, TimerId, Writable};
use crate::transport::Transform;
use crate::util::ActorId;

/// Read chunk size per syscall.
const READ_CHUNK: usize = 16 * 1024;

/// An actor owning one TCP connection, its protocol parser, and a
/// [`SessionDriver`] with the application logic.
///
/// Lifecycle: spawned by an io-handler actor (usually from a
/// [`NewConnection`](crate::transport::NewConnection) or
/// [`ConnectResult`](crate::transport::ConnectResult) event), lives until
/// the peer closes, the driver disconnects, the inactivity timeout fires,
/// or the socket errors; then notifies `owner` with one
/// [`SessionClosed`] and reaps itself.
pub struct Session<D: SessionDriver> {
    socket: TcpStream,
    proto: D::Proto,
    driver: D,
    owner: ActorId,
    peer: Option<SocketAddr>,
    token: Option<IoToken>,
    in_buf: IoBuf,
    out_buf: IoBuf,
    transform: Option<Box<dyn Transform>>,
    timeout: Option<Duration>,
    timer: Option<TimerId>,
    last_activity: Instant,
    want_write: bool,
    closing: bool,
    closed: bool,
    last_error: Option<i32>,
}

impl<D: SessionDriver> Session<D> {
    /// Wrap an established (or in-progress) nonblocking socket.
    pub fn new(socket: TcpStream, proto: D::Proto, driver: D, owner: ActorId) -> Self {
        Self {
            socket,
            proto,
            driver,
            owner,
            peer: None,
            token: None,
            in_buf: IoBuf::new(),
            out_buf: IoBuf::new(),
            transform: None,
            timeout: None,
            timer: None,
            last_activity: Instant::now(),
            want_write: false,
            closing: false,
            closed: false,
            last_error: None,
        }
    }

    /// Disconnect after `timeout` without traffic in either direction.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a byte-stream transform (the `tcps://` attachment point).
    pub fn with_transform(mut self, transform: Box<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Kernel error code observed at disconnect, if any.
    pub fn last_error(&self) -> Option<i32> {
        self.last_error
    }

    fn close(&mut self, ctx: &mut ActorContext<'_>, reason: CloseReason) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(token) = self.token.take() {
            let _ = ctx.unwatch(token, &mut self.socket);
        }
        if let Some(timer) = self.timer.take() {
            ctx.cancel_timer(timer);
        }
        self.driver.on_disconnected(ctx, reason);
        if !self.owner.is_null() {
            ctx.push(
                self.owner,
                SessionClosed {
                    session: ctx.id(),
                    reason,
                },
            );
        }
        ctx.kill();
    }

    /// Frame and deliver every complete message currently buffered.
    fn parse_frames(&mut self, ctx: &mut ActorContext<'_>) {
        loop {
            if self.closing || self.closed {
                break;
            }
            let size = match self.proto.message_size(self.in_buf.data()) {
                Ok(0) => break,
                Ok(size) => size,
                Err(e) => {
                    tracing::warn!(error = %e, "unframeable byte stream");
                    self.proto.reset();
                    self.close(ctx, CloseReason::Protocol);
                    return;
                }
            };
            if self.in_buf.len() < size {
                break;
            }
            let message = self.proto.decode(&self.in_buf.data()[..size]);
            self.in_buf.consume(size);
            match message {
                Ok(message) => {
                    let mut link = SessionLink {
                        proto: &self.proto,
                        out: &mut self.out_buf,
                        closing: &mut self.closing,
                        transform: self.transform.as_deref_mut(),
                        peer: self.peer,
                    };
                    self.driver.on_message(ctx, &mut link, message);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "frame rejected");
                    self.proto.reset();
                    self.close(ctx, CloseReason::Protocol);
                    return;
                }
            }
        }
        if self.closing {
            self.close(ctx, CloseReason::Local);
        }
    }

    /// Write queued bytes until empty or the socket pushes back, then
    /// keep the watcher's interest set in line with the queue.
    fn flush_out(&mut self, ctx: &mut ActorContext<'_>) {
        while !self.out_buf.is_empty() {
            match (&mut self.socket).write(self.out_buf.data()) {
                Ok(0) => break,
                Ok(n) => {
                    self.out_buf.consume(n);
                    self.last_activity = ctx.time();
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.last_error = e.raw_os_error();
                    self.close(ctx, CloseReason::Error);
                    return;
                }
            }
        }
        let want_write = !self.out_buf.is_empty();
        if want_write != self.want_write {
            if let Some(token) = self.token {
                let interest = if want_write {
                    Interest::READABLE | Interest::WRITABLE
                } else {
                    Interest::READABLE
                };
                if ctx.rearm(token, &mut self.socket, interest).is_ok() {
                    self.want_write = want_write;
                }
            }
        }
    }
}

impl<D: SessionDriver> Actor for Session<D> {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        self.peer = self.socket.peer_addr().ok();
        match ctx.watch(&mut self.socket, Interest::READABLE) {
            Ok(token) => self.token = Some(token),
            Err(e) => {
                tracing::error!(error = %e, "session watch failed");
                return false;
            }
        }
        ctx.register_event::<Readable, Self>();
        ctx.register_event::<Writable, Self>();
        ctx.register_event::<Disconnected, Self>();
        ctx.register_event::<TimerFired, Self>();
        self.last_activity = ctx.time();
        if let Some(timeout) = self.timeout {
            self.timer = Some(ctx.set_timer(timeout, Some(timeout)));
        }
        let mut link = SessionLink {
            proto: &self.proto,
            out: &mut self.out_buf,
            closing: &mut self.closing,
            transform: self.transform.as_deref_mut(),
            peer: self.peer,
        };
        self.driver.on_connected(ctx, &mut link);
        if self.closing {
            self.close(ctx, CloseReason::Local);
            return false;
        }
        self.flush_out(ctx);
        true
    }

    fn on_stop(&mut self, ctx: &mut ActorContext<'_>) {
        // Reached with `closed` already set on every path except runtime
        // shutdown and an external kill.
        self.close(ctx, CloseReason::Shutdown);
    }
}

impl<D: SessionDriver> Handle<Readable> for Session<D> {
    fn on(&mut self, ctx: &mut ActorContext<'_>, _event: Readable) {
        if self.closed {
            return;
        }
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match (&mut self.socket).read(&mut chunk) {
                Ok(0) => {
                    self.close(ctx, CloseReason::Peer);
                    return;
                }
                Ok(n) => {
                    self.last_activity = ctx.time();
                    match self.transform.as_deref_mut() {
                        None => self.in_buf.extend(&chunk[..n]),
                        Some(transform) => {
                            if let Err(e) =
                                transform.on_input(&chunk[..n], self.in_buf.append_vec())
                            {
                                tracing::warn!(error = %e, "input transform failed");
                                self.close(ctx, CloseReason::Error);
                                return;
                            }
                        }
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.last_error = e.raw_os_error();
                    self.close(ctx, CloseReason::Error);
                    return;
                }
            }
        }
        self.parse_frames(ctx);
        if !self.closed {
            self.flush_out(ctx);
        }
    }
}

impl<D: SessionDriver> Handle<Writable> for Session<D> {
    fn on(&mut self, ctx: &mut ActorContext<'_>, _event: Writable) {
        if self.closed {
            return;
        }
        self.flush_out(ctx);
    }
}

impl<D: SessionDriver> Handle<Disconnected> for Session<D> {
    fn on(&mut self, ctx: &mut ActorContext<'_>, _event: Disconnected) {
        if self.closed {
            return;
        }
        self.last_error = self
            .socket
            .take_error()
            .ok()
            .flatten()
            .and_then(|e| e.raw_os_error());
        self.close(ctx, CloseReason::Error);
    }
}

impl<D: SessionDriver> Handle<TimerFired> for Session<D> {
    fn on(&mut self, ctx: &mut ActorContext<'_>, _event: TimerFired) {
        if self.closed {
            return;
        }
        let Some(timeout) = self.timeout else {
            return;
        };
        if ctx.time().saturating_duration_since(self.last_activity) >= timeout {
            self.close(ctx, CloseReason::Timeout);
        }
    }
}
