//! Server lifecycle state machine.
//!
//! # Responsibilities
//! - Probe the bind address before anything else touches disk
//! - Clear stale socket files from crashed predecessors
//! - Open storages, arm signals, hand off to the serving loop (in that
//!   order), and guarantee teardown on every exit path
//!
//! # State Machine
//! ```text
//! Init → Preflight → StoragesOpen → SignalsArmed → Serving
//!                                                     │
//!                         ShuttingDown ◀──────────────┘
//!                              │      (normal stop, signal, or failure)
//!                              ▼
//!                           Closed
//! ```
//!
//! `Closed` is the only normal terminal state. A failure anywhere past
//! Preflight still passes through ShuttingDown → Closed before the
//! error propagates.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

use crate::config::address::ListenAddr;
use crate::config::options::{ResolvedOptions, UsageError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::{self, SignalTable};
use crate::observability::logging::LogHandle;
use crate::serve::{RequestLoop, ServeError, ServeOptions};
use crate::storage::registry::{StorageOpenError, StorageRegistry};

/// How long the preflight probe waits for a peer to accept. Only an
/// accepted connection counts as "in use"; refusal or timeout means the
/// address is free.
const PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Lifecycle states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Init,
    Preflight,
    StoragesOpen,
    SignalsArmed,
    Serving,
    ShuttingDown,
    Closed,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Init => "init",
            ServerState::Preflight => "preflight",
            ServerState::StoragesOpen => "storages_open",
            ServerState::SignalsArmed => "signals_armed",
            ServerState::Serving => "serving",
            ServerState::ShuttingDown => "shutting_down",
            ServerState::Closed => "closed",
        }
    }
}

/// Error driving the daemon's exit code.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Operator-facing; printed to stderr, exit 2.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A storage failed to open; propagates after teardown, exit 1.
    #[error(transparent)]
    Open(#[from] StorageOpenError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] io::Error),

    /// The serving loop failed; propagates after teardown, exit 1.
    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// The server process: resolved options, the storage registry, the
/// signal table, and the shutdown coordinator, driven through the
/// lifecycle by [`run`].
///
/// [`run`]: StashServer::run
pub struct StashServer {
    options: ResolvedOptions,
    registry: StorageRegistry,
    signal_table: SignalTable,
    shutdown: Shutdown,
    state: ServerState,
    log: LogHandle,
}

impl StashServer {
    pub fn new(options: ResolvedOptions, log: LogHandle) -> Self {
        Self {
            options,
            registry: StorageRegistry::new(),
            signal_table: SignalTable::server_default(),
            shutdown: Shutdown::new(),
            state: ServerState::Init,
            log,
        }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Handle that stops the server programmatically, exactly as a
    /// termination signal would.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Drive the full lifecycle: preflight, open storages, arm signals,
    /// serve, teardown. Consuming the server is what makes "the registry
    /// is closed exactly once per process lifetime" hold.
    pub async fn run(mut self, serve_loop: &mut dyn RequestLoop) -> Result<(), ServerError> {
        self.set_state(ServerState::Preflight);
        self.check_address().await?;
        self.clear_stale_socket();

        // Everything from the first storage open through the serving
        // hand-off owes the teardown below, so it lives in one guarded
        // call whose result is returned only after teardown has run.
        let outcome = self.startup_and_serve(serve_loop).await;

        self.set_state(ServerState::ShuttingDown);
        self.registry.close_all();
        self.clear_stale_socket();
        self.set_state(ServerState::Closed);

        outcome
    }

    async fn startup_and_serve(
        &mut self,
        serve_loop: &mut dyn RequestLoop,
    ) -> Result<(), ServerError> {
        self.registry.open_all(&self.options.storages)?;
        self.set_state(ServerState::StoragesOpen);

        // Subscribe before arming: a signal delivered right after the
        // handlers exist must still reach the hand-off below.
        let shutdown_rx = self.shutdown.subscribe();
        signals::install(&self.signal_table, &self.shutdown, &self.log)
            .map_err(ServerError::Signals)?;
        self.set_state(ServerState::SignalsArmed);

        self.set_state(ServerState::Serving);
        let serve_options = ServeOptions::from_resolved(&self.options);
        serve_loop
            .run(&serve_options, &self.registry, shutdown_rx)
            .await?;
        Ok(())
    }

    /// Report "address already in use" before any storage is touched.
    async fn check_address(&self) -> Result<(), ServerError> {
        if self.can_connect().await {
            return Err(ServerError::Usage(UsageError::AddressInUse(
                self.options.address.to_string(),
            )));
        }
        tracing::debug!(address = %self.options.address, "address is free");
        Ok(())
    }

    async fn can_connect(&self) -> bool {
        let probe = async {
            match &self.options.address {
                ListenAddr::Tcp { .. } => {
                    TcpStream::connect(self.options.address.probe_target())
                        .await
                        .is_ok()
                }
                #[cfg(unix)]
                ListenAddr::Unix { path } => UnixStream::connect(path).await.is_ok(),
                #[cfg(not(unix))]
                ListenAddr::Unix { .. } => false,
            }
        };
        tokio::time::timeout(PROBE_TIMEOUT, probe)
            .await
            .unwrap_or(false)
    }

    /// Remove a leftover socket file from a previous instance. Runs both
    /// before storages open and after they close, so the next instance
    /// finds the address free. Absence and removal races are fine.
    fn clear_stale_socket(&self) {
        let Some(path) = self.options.address.socket_path() else {
            return;
        };
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale socket file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "could not remove socket file")
            }
        }
    }

    fn set_state(&mut self, next: ServerState) {
        tracing::debug!(from = self.state.as_str(), to = next.as_str(), "lifecycle transition");
        self.state = next;
    }
}
