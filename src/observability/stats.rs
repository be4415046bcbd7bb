//! Server statistics for the status command and the monitor listener.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Point-in-time statistics snapshot, serialized as one JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub address: String,
    pub read_only: bool,
    pub invalidation_queue_size: usize,
    pub transaction_timeout_secs: Option<u64>,
    pub storages: Vec<String>,
    pub active_sessions: u64,
    pub total_sessions: u64,
    pub uptime_secs: u64,
}

/// Live session counters maintained by the serving loop.
///
/// Clones share the same counters; the guard returned by [`track`]
/// decrements the active count on drop, so a session that panics still
/// releases its slot in the count.
///
/// [`track`]: SessionCounter::track
#[derive(Clone)]
pub struct SessionCounter {
    active: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
    started: Instant,
}

impl SessionCounter {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(0)),
            started: Instant::now(),
        }
    }

    /// Record a new session. Hold the guard for the session's lifetime.
    pub fn track(&self) -> SessionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        SessionGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub fn active(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for SessionCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard tracking one session's lifetime.
pub struct SessionGuard {
    active: Arc<AtomicU64>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything needed to build snapshots; shared by the `stat` command
/// and the monitor listener.
#[derive(Clone)]
pub struct StatsContext {
    address: String,
    read_only: bool,
    invalidation_queue_size: usize,
    transaction_timeout_secs: Option<u64>,
    storages: Arc<Vec<String>>,
    sessions: SessionCounter,
}

impl StatsContext {
    pub fn new(
        address: String,
        read_only: bool,
        invalidation_queue_size: usize,
        transaction_timeout: Option<Duration>,
        storages: Vec<String>,
    ) -> Self {
        Self {
            address,
            read_only,
            invalidation_queue_size,
            transaction_timeout_secs: transaction_timeout.map(|t| t.as_secs()),
            storages: Arc::new(storages),
            sessions: SessionCounter::new(),
        }
    }

    pub fn sessions(&self) -> &SessionCounter {
        &self.sessions
    }

    /// Names of the served storages, in open order.
    pub fn storage_names(&self) -> &[String] {
        &self.storages
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            address: self.address.clone(),
            read_only: self.read_only,
            invalidation_queue_size: self.invalidation_queue_size,
            transaction_timeout_secs: self.transaction_timeout_secs,
            storages: self.storages.as_ref().clone(),
            active_sessions: self.sessions.active(),
            total_sessions: self.sessions.total(),
            uptime_secs: self.sessions.uptime().as_secs(),
        }
    }
}
