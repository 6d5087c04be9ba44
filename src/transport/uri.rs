//! Endpoint uris: `scheme://host:port[/path]`.

// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Supported transport schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    /// Plain TCP stream.
    Tcp,
    /// Datagram socket.
    Udp,
    /// TCP with a byte-stream transform (e.g. TLS) attached by the
    /// application.
    Tcps,
}

impl Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Tcp => write!(f, "tcp"),
            Scheme::Udp => write!(f, "udp"),
            Scheme::Tcps => write!(f, "tcps"),
        }
    }
}

/// Uri parse failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("missing scheme separator '://'")]
    MissingScheme,

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("missing port")]
    MissingPort,

    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// A parsed endpoint: scheme, host, port, optional path.
///
/// # Example
/// ```rust
/// use coreactor::transport::{Scheme, Uri};
///
/// let uri: Uri = "tcp://127.0.0.1:9000".parse().unwrap();
/// assert_eq!(uri.scheme, Scheme::Tcp);
/// assert_eq!(uri.host, "127.0.0.1");
/// assert_eq!(uri.port, 9000);
/// assert!(uri.path.is_none());
///
/// let uri: Uri = "tcps://example.net:443/feed".parse().unwrap();
/// assert_eq!(uri.path.as_deref(), Some("/feed"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uri {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: Option<String>,
}

impl Uri {
    /// Resolve the host/port to socket addresses. Resolution may consult
    /// the system resolver and block; prefer literal addresses on hot
    /// paths.
    pub fn socket_addrs(&self) -> std::io::Result<Vec<SocketAddr>> {
        Ok((self.host.as_str(), self.port).to_socket_addrs()?.collect())
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, UriError> {
        let (scheme, rest) = s.split_once("://").ok_or(UriError::MissingScheme)?;
        let scheme = match scheme {
            "tcp" => Scheme::Tcp,
            "udp" => Scheme::Udp,
            "tcps" => Scheme::Tcps,
            other => return Err(UriError::UnsupportedScheme(other.to_string())),
        };

        // Split an optional path off first, honouring bracketed v6 hosts.
        let path_start = if rest.starts_with('[') {
            rest.find(']').map(|close| close + 1).unwrap_or(0)
        } else {
            0
        };
        let (authority, path) = match rest[path_start..].find('/') {
            Some(i) => {
                let split = path_start + i;
                (&rest[..split], Some(rest[split..].to_string()))
            }
            None => (rest, None),
        };

        let (host, port) = if let Some(v6) = authority.strip_prefix('[') {
            let (host, after) = v6.split_once(']').ok_or(UriError::MissingHost)?;
            let port = after.strip_prefix(':').ok_or(UriError::MissingPort)?;
            (host, port)
        } else {
            authority.rsplit_once(':').ok_or(UriError::MissingPort)?
        };
        if host.is_empty() {
            return Err(UriError::MissingHost);
        }
        let port: u16 = port
            .parse()
            .map_err(|_| UriError::InvalidPort(port.to_string()))?;

        Ok(Uri {
            scheme,
            host: host.to_string(),
            port,
            path,
        })
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bracket = self.host.contains(':');
        write!(f, "{}://", self.scheme)?;
        if bracket {
            write!(f, "[{}]", self.host)?;
        } else {
            write!(f, "{}", self.host)?;
        }
        write!(f, ":{}", self.port)?;
        if let Some(path) = &self.path {
            write!(f, "{path}")?;
        }
        Ok(())
    }
}
