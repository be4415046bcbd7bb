//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured records via the severity facade)
//!     → stats.rs (session counters, snapshots)
//!
//! Consumers:
//!     → stderr or a reopenable log file (SIGUSR2 rotation)
//!     → the `stat` command and the monitor listener (JSON snapshots)
//! ```
//!
//! # Design Decisions
//! - Severities map onto tracing; Critical is ERROR plus a marker field
//! - Log rotation swaps the file handle, never restarts the process
//! - Stats are cheap (atomic counters + a guard per session)

pub mod logging;
pub mod stats;

pub use logging::{LogHandle, Severity};
pub use stats::{SessionCounter, StatsContext, StatsSnapshot};
