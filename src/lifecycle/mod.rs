//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Server (server.rs):
//!     Preflight probe → Clear stale socket → Open storages
//!         → Arm signals → Serve → Teardown (always)
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed receiver wakes → serving loop exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGUSR2 → Reopen log outputs
//! ```
//!
//! # Design Decisions
//! - Ordered startup: address first, then storages, then signals
//! - Teardown is unconditional: storages close and the socket file is
//!   cleared on success, failure, and signal stop alike
//! - The shutdown receiver is subscribed before signals are armed, so a
//!   signal landing mid-startup is never lost

pub mod server;
pub mod shutdown;
pub mod signals;

pub use server::{ServerError, ServerState, StashServer};
pub use shutdown::{Shutdown, ShutdownReceiver};
pub use signals::{SignalAction, SignalTable};
