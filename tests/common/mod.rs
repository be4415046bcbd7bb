//! Shared utilities for lifecycle and service integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use stashd::config::address::ListenAddr;
use stashd::config::options::{ResolvedOptions, StorageSpec};
use stashd::config::schema::LogConfig;
use stashd::lifecycle::ShutdownReceiver;
use stashd::serve::{connect, AsyncStream, RequestLoop, ServeError, ServeOptions};
use stashd::storage::backend::{Storage, StorageError, StorageOpener};
use stashd::storage::registry::StorageRegistry;

/// Journal of storage events, shared between a test and its openers.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Two distinct ports that were free a moment ago. Both are held while
/// picking, so they can never collide with each other.
#[allow(dead_code)]
pub fn free_port_pair() -> (u16, u16) {
    let a = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let b = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    (
        a.local_addr().unwrap().port(),
        b.local_addr().unwrap().port(),
    )
}

/// Opener that records opens and closes in a shared journal.
pub struct TrackingOpener {
    label: String,
    journal: Journal,
    fail: bool,
}

impl TrackingOpener {
    pub fn new(label: &str, journal: &Journal) -> Self {
        Self {
            label: label.to_string(),
            journal: journal.clone(),
            fail: false,
        }
    }

    /// Opener whose open() always fails, for startup-failure paths.
    #[allow(dead_code)]
    pub fn failing(label: &str, journal: &Journal) -> Self {
        Self {
            label: label.to_string(),
            journal: journal.clone(),
            fail: true,
        }
    }
}

impl StorageOpener for TrackingOpener {
    fn kind(&self) -> &'static str {
        "tracking"
    }

    fn open(&self) -> Result<Box<dyn Storage>, StorageError> {
        if self.fail {
            self.journal
                .lock()
                .unwrap()
                .push(format!("fail {}", self.label));
            return Err(StorageError::Io {
                path: self.label.clone().into(),
                source: std::io::Error::other("injected open failure"),
            });
        }
        self.journal
            .lock()
            .unwrap()
            .push(format!("open {}", self.label));
        Ok(Box::new(TrackingStorage {
            label: self.label.clone(),
            journal: self.journal.clone(),
        }))
    }
}

struct TrackingStorage {
    label: String,
    journal: Journal,
}

impl Storage for TrackingStorage {
    fn kind(&self) -> &'static str {
        "tracking"
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("close {}", self.label));
        Ok(())
    }
}

pub fn spec(name: &str, opener: TrackingOpener) -> StorageSpec {
    StorageSpec {
        name: name.to_string(),
        opener: Box::new(opener),
    }
}

/// Options for a server on `addr` with the given storages and the
/// defaults everywhere else.
pub fn options_for(addr: ListenAddr, storages: Vec<StorageSpec>) -> ResolvedOptions {
    ResolvedOptions {
        address: addr,
        storages,
        read_only: false,
        invalidation_queue_size: 100,
        transaction_timeout: None,
        monitor: None,
        max_connections: 16,
        log: LogConfig::default(),
    }
}

/// Serving loop that binds nothing and just waits to be stopped.
#[allow(dead_code)]
pub struct IdleLoop;

#[async_trait]
impl RequestLoop for IdleLoop {
    async fn run(
        &mut self,
        _options: &ServeOptions,
        _registry: &StorageRegistry,
        mut shutdown: ShutdownReceiver,
    ) -> Result<(), ServeError> {
        shutdown.recv().await;
        Ok(())
    }
}

/// Serving loop that fails as soon as it starts.
#[allow(dead_code)]
pub struct FailLoop;

#[async_trait]
impl RequestLoop for FailLoop {
    async fn run(
        &mut self,
        _options: &ServeOptions,
        _registry: &StorageRegistry,
        _shutdown: ShutdownReceiver,
    ) -> Result<(), ServeError> {
        Err(ServeError::Fault("injected serving fault".to_string()))
    }
}

/// Connect with retries while the server task is still binding.
pub async fn connect_soon(addr: &ListenAddr) -> Box<dyn AsyncStream> {
    for _ in 0..50 {
        if let Ok(stream) = connect(addr).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {addr} did not come up");
}
