//! Serving subsystem.
//!
//! # Data Flow
//! ```text
//! Listener (listener.rs):
//!     ListenAddr → bind (TCP or Unix) → accept (bounded by permits)
//!
//! Service (service.rs):
//!     accept → session task → line commands (stat / stores / quit)
//!     shutdown receiver fires → stop accepting → loop returns
//!
//! Monitor (monitor.rs):
//!     accept → one JSON status line → close
//! ```
//!
//! # Design Decisions
//! - The serving loop is a trait seam: the lifecycle drives any
//!   [`RequestLoop`]; the built-in [`StorageService`] is just one
//! - max_connections is enforced at accept time via owned permits
//! - Sessions see a name snapshot of the registry, never the registry

pub mod listener;
pub mod monitor;
pub mod service;

pub use listener::{connect, AsyncStream, BoundListener};
pub use monitor::MonitorServer;
pub use service::StorageService;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::address::ListenAddr;
use crate::config::options::ResolvedOptions;
use crate::lifecycle::shutdown::ShutdownReceiver;
use crate::storage::registry::StorageRegistry;

/// Serving parameters, carved out of [`ResolvedOptions`] so a serving
/// loop never sees storage openers or logging settings.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub address: ListenAddr,
    pub read_only: bool,
    pub invalidation_queue_size: usize,
    pub transaction_timeout: Option<Duration>,
    pub monitor: Option<ListenAddr>,
    pub max_connections: usize,
}

impl ServeOptions {
    pub fn from_resolved(options: &ResolvedOptions) -> Self {
        Self {
            address: options.address.clone(),
            read_only: options.read_only,
            invalidation_queue_size: options.invalidation_queue_size,
            transaction_timeout: options.transaction_timeout,
            monitor: options.monitor.clone(),
            max_connections: options.max_connections,
        }
    }
}

/// Error surfaced by a serving loop. Bind and accept failures carry the
/// address they happened on.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept on {address}: {source}")]
    Accept {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serving fault: {0}")]
    Fault(String),
}

/// The loop the lifecycle hands control to once storages are open and
/// signals are armed. Implementations serve until the shutdown receiver
/// fires, then return; an error return is treated as a fault and still
/// goes through full teardown.
#[async_trait]
pub trait RequestLoop: Send {
    async fn run(
        &mut self,
        options: &ServeOptions,
        registry: &StorageRegistry,
        shutdown: ShutdownReceiver,
    ) -> Result<(), ServeError>;
}
