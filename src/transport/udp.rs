//! Nonblocking datagram endpoint for `udp://` uris.

// Layer 1: Standard library imports
use std::io;
use std::net::SocketAddr;

// Layer 2: Third-party crate imports
use mio::net::UdpSocket;
use mio::Interest;

// Layer 3: Internal module imports
use super::error::TransportError;
use super::uri::{Scheme, Uri};
use crate::actor::ActorContext;
use crate::reactor::{IoToken, ReactorError};

/// A bound datagram socket owned by an actor.
///
/// The owner watches it for readability and drains with
/// [`recv_from`](UdpEndpoint::recv_from) until it returns `None`.
pub struct UdpEndpoint {
    socket: UdpSocket,
}

impl UdpEndpoint {
    /// Bind a datagram socket described by a `udp://` uri.
    pub fn bind(uri: &Uri) -> Result<Self, TransportError> {
        if uri.scheme != Scheme::Udp {
            return Err(TransportError::Resolve(format!(
                "{uri} is not a udp endpoint"
            )));
        }
        let addrs = uri.socket_addrs().map_err(TransportError::Bind)?;
        let mut last = io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses");
        for addr in addrs {
            match UdpSocket::bind(addr) {
                Ok(socket) => return Ok(Self { socket }),
                Err(e) => last = e,
            }
        }
        Err(TransportError::Bind(last))
    }

    /// Register with the owning actor's reactor.
    pub fn watch(
        &mut self,
        ctx: &mut ActorContext<'_>,
        interest: Interest,
    ) -> Result<IoToken, ReactorError> {
        ctx.watch(&mut self.socket, interest)
    }

    /// Receive one datagram; `None` when the socket would block.
    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok(pair) => Ok(Some(pair)),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Send one datagram; `None` when the socket would block.
    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<Option<usize>> {
        match self.socket.send_to(buf, target) {
            Ok(n) => Ok(Some(n)),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The bound local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_rejects_stream_schemes() {
        let uri: Uri = "tcp://127.0.0.1:0".parse().unwrap();
        assert!(UdpEndpoint::bind(&uri).is_err());
    }

    #[test]
    fn test_datagram_roundtrip() {
        let a = UdpEndpoint::bind(&"udp://127.0.0.1:0".parse().unwrap()).unwrap();
        let b = UdpEndpoint::bind(&"udp://127.0.0.1:0".parse().unwrap()).unwrap();
        let target = b.local_addr().unwrap();
        a.send_to(b"ping", target).unwrap();

        let mut buf = [0u8; 16];
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            match b.recv_from(&mut buf).unwrap() {
                Some((n, from)) => {
                    assert_eq!(&buf[..n], b"ping");
                    assert_eq!(from, a.local_addr().unwrap());
                    break;
                }
                None if std::time::Instant::now() < deadline => {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
                None => panic!("datagram never arrived"),
            }
        }
    }
}
