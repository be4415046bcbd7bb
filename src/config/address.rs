//! Listen address parsing.
//!
//! # Responsibilities
//! - Parse the three accepted address forms: bare port, "host:port", path
//! - Carry the address family (tcp vs unix) through the lifecycle
//! - Produce bind and probe targets for listeners and the preflight check

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for address parsing.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The text matched none of the accepted forms.
    #[error("unrecognized address {0:?} (expected PORT, HOST:PORT, or a path containing '/')")]
    Unrecognized(String),

    /// The port component did not parse as a 16-bit integer.
    #[error("invalid port in address {0:?}")]
    InvalidPort(String),
}

/// A resolved listen address.
///
/// `Tcp { host: None, .. }` means "all interfaces", the form produced by a
/// bare port number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    Tcp { host: Option<String>, port: u16 },
    Unix { path: PathBuf },
}

impl ListenAddr {
    /// Parse an address in one of three forms: a bare port number, a
    /// "host:port" pair, or a filesystem path. A path must contain at
    /// least one '/' and selects the Unix-socket family.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        if text.contains('/') {
            return Ok(ListenAddr::Unix {
                path: PathBuf::from(text),
            });
        }

        if let Ok(port) = text.parse::<u16>() {
            return Ok(ListenAddr::Tcp { host: None, port });
        }

        if let Some((host, port)) = text.rsplit_once(':') {
            let port = port
                .parse::<u16>()
                .map_err(|_| AddressError::InvalidPort(text.to_string()))?;
            let host = if host.is_empty() {
                None
            } else {
                Some(host.to_string())
            };
            return Ok(ListenAddr::Tcp { host, port });
        }

        Err(AddressError::Unrecognized(text.to_string()))
    }

    /// The address family as a short label for logs and stats.
    pub fn family(&self) -> &'static str {
        match self {
            ListenAddr::Tcp { .. } => "tcp",
            ListenAddr::Unix { .. } => "unix",
        }
    }

    /// The target a listener should bind. Host-less TCP addresses bind
    /// all interfaces.
    pub fn bind_target(&self) -> String {
        match self {
            ListenAddr::Tcp { host, port } => {
                format!("{}:{}", host.as_deref().unwrap_or("0.0.0.0"), port)
            }
            ListenAddr::Unix { path } => path.display().to_string(),
        }
    }

    /// The target the preflight probe should connect to. A host-less TCP
    /// address is probed via loopback, since that is where a peer bound to
    /// all interfaces is reachable from this machine.
    pub fn probe_target(&self) -> String {
        match self {
            ListenAddr::Tcp { host, port } => {
                let host = match host.as_deref() {
                    None | Some("") | Some("0.0.0.0") => "127.0.0.1",
                    Some(h) => h,
                };
                format!("{}:{}", host, port)
            }
            ListenAddr::Unix { path } => path.display().to_string(),
        }
    }

    /// The socket path, for path-based addresses only.
    pub fn socket_path(&self) -> Option<&Path> {
        match self {
            ListenAddr::Tcp { .. } => None,
            ListenAddr::Unix { path } => Some(path),
        }
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenAddr::Tcp { host, port } => {
                write!(f, "{}:{}", host.as_deref().unwrap_or(""), port)
            }
            ListenAddr::Unix { path } => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_port_is_tcp_any() {
        let addr = ListenAddr::parse("8100").unwrap();
        assert_eq!(
            addr,
            ListenAddr::Tcp {
                host: None,
                port: 8100
            }
        );
        assert_eq!(addr.family(), "tcp");
        assert_eq!(addr.bind_target(), "0.0.0.0:8100");
        assert_eq!(addr.probe_target(), "127.0.0.1:8100");
    }

    #[test]
    fn host_port_pair() {
        let addr = ListenAddr::parse("localhost:9000").unwrap();
        assert_eq!(
            addr,
            ListenAddr::Tcp {
                host: Some("localhost".to_string()),
                port: 9000
            }
        );
        assert_eq!(addr.bind_target(), "localhost:9000");
        assert_eq!(addr.probe_target(), "localhost:9000");
    }

    #[test]
    fn empty_host_behaves_like_bare_port() {
        let addr = ListenAddr::parse(":8100").unwrap();
        assert_eq!(
            addr,
            ListenAddr::Tcp {
                host: None,
                port: 8100
            }
        );
    }

    #[test]
    fn path_selects_unix_family() {
        let addr = ListenAddr::parse("/tmp/stashd.sock").unwrap();
        assert_eq!(addr.family(), "unix");
        assert_eq!(addr.socket_path(), Some(Path::new("/tmp/stashd.sock")));
    }

    #[test]
    fn relative_path_with_separator_is_unix() {
        let addr = ListenAddr::parse("run/stashd.sock").unwrap();
        assert_eq!(addr.family(), "unix");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            ListenAddr::parse("not-an-address"),
            Err(AddressError::Unrecognized(_))
        ));
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(matches!(
            ListenAddr::parse("host:99999"),
            Err(AddressError::InvalidPort(_))
        ));
        assert!(matches!(
            ListenAddr::parse("host:abc"),
            Err(AddressError::InvalidPort(_))
        ));
    }

    #[test]
    fn display_round_trips_meaning() {
        assert_eq!(ListenAddr::parse("8100").unwrap().to_string(), ":8100");
        assert_eq!(
            ListenAddr::parse("db.internal:8100").unwrap().to_string(),
            "db.internal:8100"
        );
        assert_eq!(
            ListenAddr::parse("/run/s.sock").unwrap().to_string(),
            "/run/s.sock"
        );
    }
}
