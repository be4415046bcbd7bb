//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the storage daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StashConfig {
    /// Server settings (address, limits, timeouts).
    pub server: ServerConfig,

    /// Storage backend definitions, opened in declaration order.
    pub storage: Vec<StorageConfig>,

    /// Logging settings.
    pub log: LogConfig,
}

/// Server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address: a bare port, "host:port", or a filesystem path
    /// (selects a Unix socket; must contain a '/').
    pub address: Option<String>,

    /// Serve every storage read-only.
    pub read_only: bool,

    /// Number of invalidations buffered for reconnecting clients.
    pub invalidation_queue_size: usize,

    /// Idle sessions are disconnected after this many seconds.
    pub transaction_timeout_secs: Option<u64>,

    /// Optional monitor address; same forms as `address`.
    pub monitor: Option<String>,

    /// Maximum concurrent sessions (backpressure).
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: None,
            read_only: false,
            invalidation_queue_size: 100,
            transaction_timeout_secs: None,
            monitor: None,
            max_connections: 1000,
        }
    }
}

/// One storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Registry name. Defaults to the section's 1-based position.
    pub name: Option<String>,

    /// Backend kind.
    #[serde(default)]
    pub kind: StorageKind,

    /// Data file path. Required for `file` storages.
    pub path: Option<PathBuf>,
}

/// Supported storage backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// File-backed store with an exclusive lock file.
    #[default]
    File,
    /// In-memory store; contents are lost on shutdown.
    Memory,
}

impl StorageKind {
    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::File => "file",
            StorageKind::Memory => "memory",
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default severity (critical, error, warning, info, debug).
    /// `RUST_LOG` overrides this when set.
    pub level: String,

    /// Log file path. Logs go to stderr when unset.
    pub path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            path: None,
        }
    }
}
