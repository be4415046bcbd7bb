//! Stream listener over TCP and Unix domain sockets.
//!
//! # Responsibilities
//! - Bind the resolved listen address, whichever family it is
//! - Accept sessions, bounded by a semaphore sized to max_connections
//! - Hand each session an opaque stream plus the permit holding its slot

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Semaphore;

use crate::config::address::ListenAddr;

/// Byte stream a session runs over, whatever the socket family.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

/// A bounded listener over either socket family.
///
/// Uses a semaphore to enforce the session limit. When the limit is
/// reached, accept waits for a slot before touching the socket.
pub struct BoundListener {
    inner: ListenerInner,
    label: String,
    session_limit: Arc<Semaphore>,
}

impl BoundListener {
    /// Bind `addr` with at most `max_sessions` concurrent sessions.
    pub async fn bind(addr: &ListenAddr, max_sessions: usize) -> io::Result<Self> {
        let inner = match addr {
            ListenAddr::Tcp { .. } => {
                ListenerInner::Tcp(TcpListener::bind(addr.bind_target()).await?)
            }
            #[cfg(unix)]
            ListenAddr::Unix { path } => ListenerInner::Unix(UnixListener::bind(path)?),
            #[cfg(not(unix))]
            ListenAddr::Unix { .. } => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "unix sockets are not available on this platform",
                ))
            }
        };

        tracing::info!(address = %addr, max_sessions, "listener bound");

        Ok(Self {
            inner,
            label: addr.to_string(),
            session_limit: Arc::new(Semaphore::new(max_sessions)),
        })
    }

    /// Accept the next session, waiting for a free slot first.
    ///
    /// Returns the stream, a peer label for logs, and the permit that
    /// must be held for the session's lifetime.
    pub async fn accept(&self) -> io::Result<(Box<dyn AsyncStream>, String, SessionPermit)> {
        // Acquire the permit first (backpressure before accept)
        let permit = self
            .session_limit
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore closed unexpectedly");

        let (stream, peer) = match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                (Box::new(stream) as Box<dyn AsyncStream>, addr.to_string())
            }
            #[cfg(unix)]
            ListenerInner::Unix(listener) => {
                // Unix peers are anonymous; label them with the socket path
                let (stream, _) = listener.accept().await?;
                (Box::new(stream) as Box<dyn AsyncStream>, self.label.clone())
            }
        };

        tracing::debug!(
            peer = %peer,
            available_permits = self.session_limit.available_permits(),
            "session accepted"
        );

        Ok((stream, peer, SessionPermit { _permit: permit }))
    }

    /// Current free session slots.
    pub fn available_permits(&self) -> usize {
        self.session_limit.available_permits()
    }
}

/// A permit representing a session slot.
///
/// Dropping it releases the slot, so the limit holds even when a
/// session task panics.
#[derive(Debug)]
pub struct SessionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

/// Client side of the same address logic, for the control utility and
/// tests.
pub async fn connect(addr: &ListenAddr) -> io::Result<Box<dyn AsyncStream>> {
    match addr {
        ListenAddr::Tcp { .. } => {
            let stream = TcpStream::connect(addr.probe_target()).await?;
            Ok(Box::new(stream))
        }
        #[cfg(unix)]
        ListenAddr::Unix { path } => {
            let stream = UnixStream::connect(path).await?;
            Ok(Box::new(stream))
        }
        #[cfg(not(unix))]
        ListenAddr::Unix { .. } => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unix sockets are not available on this platform",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test]
    async fn permit_restores_capacity_on_drop() {
        let addr = ListenAddr::Tcp {
            host: Some("127.0.0.1".to_string()),
            port: free_port(),
        };
        let listener = BoundListener::bind(&addr, 1).await.unwrap();

        let _client = connect(&addr).await.unwrap();
        let (stream, _peer, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 0);

        drop(stream);
        drop(permit);
        assert_eq!(listener.available_permits(), 1);
    }

    #[tokio::test]
    async fn tcp_peers_are_labelled_with_their_address() {
        let addr = ListenAddr::Tcp {
            host: Some("127.0.0.1".to_string()),
            port: free_port(),
        };
        let listener = BoundListener::bind(&addr, 4).await.unwrap();

        let _client = connect(&addr).await.unwrap();
        let (_stream, peer, _permit) = listener.accept().await.unwrap();
        assert!(peer.starts_with("127.0.0.1:"), "unexpected label {peer}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unix_sockets_accept_and_label_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let addr = ListenAddr::Unix {
            path: dir.path().join("stashd-test.sock"),
        };
        let listener = BoundListener::bind(&addr, 4).await.unwrap();

        let _client = connect(&addr).await.unwrap();
        let (_stream, peer, _permit) = listener.accept().await.unwrap();
        assert_eq!(peer, addr.to_string());
    }
}
