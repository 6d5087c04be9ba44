//! The application side of a session: driver trait, send link, and the
//! close notification event.

// Layer 1: Standard library imports
use std::net::SocketAddr;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::buffer::IoBuf;
use crate::actor::ActorContext;
use crate::event::Event;
use crate::protocol::Protocol;
use crate::transport::Transform;
use crate::util::ActorId;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the stream.
    Peer,
    /// The application called [`SessionLink::disconnect`].
    Local,
    /// The inactivity timeout expired.
    Timeout,
    /// The parser rejected the byte stream.
    Protocol,
    /// A socket error; the code, when the kernel reported one, is on
    /// [`Session::last_error`](super::Session::last_error).
    Error,
    /// The runtime is stopping.
    Shutdown,
}

/// Sent exactly once to a session's owning io-handler when the session
/// ends, whatever the cause.
#[derive(Debug, Clone, Copy)]
pub struct SessionClosed {
    pub session: ActorId,
    pub reason: CloseReason,
}

impl Event for SessionClosed {
    const NAME: &'static str = "session_closed";
}

/// Application logic bound to one connection.
///
/// The driver never touches the socket: it receives decoded messages and
/// replies through the [`SessionLink`], which frames and queues bytes for
/// the session's write path.
pub trait SessionDriver: Send + 'static {
    type Proto: Protocol;

    /// The connection is up and events are flowing.
    fn on_connected(
        &mut self,
        _ctx: &mut ActorContext<'_>,
        _link: &mut SessionLink<'_, Self::Proto>,
    ) {
    }

    /// One complete message, framed and decoded by the protocol.
    fn on_message(
        &mut self,
        ctx: &mut ActorContext<'_>,
        link: &mut SessionLink<'_, Self::Proto>,
        message: <Self::Proto as Protocol>::Message,
    );

    /// The connection ended; called exactly once, before the owner is
    /// notified.
    fn on_disconnected(&mut self, _ctx: &mut ActorContext<'_>, _reason: CloseReason) {}
}

/// Outbound half of a session, lent to the driver during callbacks.
pub struct SessionLink<'a, P: Protocol> {
    pub(super) proto: &'a P,
    pub(super) out: &'a mut IoBuf,
    pub(super) closing: &'a mut bool,
    pub(super) transform: Option<&'a mut dyn Transform>,
    pub(super) peer: Option<SocketAddr>,
}

impl<P: Protocol> SessionLink<'_, P> {
    /// Serialise `message` into the output buffer; the session arms the
    /// write path after the callback returns.
    pub fn send(&mut self, message: &P::Message) {
        match self.transform.as_deref_mut() {
            None => self.proto.encode(message, self.out.append_vec()),
            Some(transform) => {
                let mut plain = Vec::new();
                self.proto.encode(message, &mut plain);
                if let Err(e) = transform.on_output(&plain, self.out.append_vec()) {
                    tracing::warn!(error = %e, "output transform failed, closing");
                    *self.closing = true;
                }
            }
        }
    }

    /// Request a graceful close once the current callback returns.
    pub fn disconnect(&mut self) {
        *self.closing = true;
    }

    /// The peer address, when known.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Bytes queued and not yet written.
    pub fn pending_out(&self) -> usize {
        self.out.len()
    }
}
