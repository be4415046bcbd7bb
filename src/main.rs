//! Stashd Storage Server (v1)
//!
//! A networked storage daemon built with Tokio.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────┐
//!                     │                 STASHD SERVER                 │
//!                     │                                               │
//!     CLI flags       │  ┌─────────┐    ┌───────────┐    ┌─────────┐ │
//!     ────────────────┼─▶│ config  │───▶│ lifecycle │───▶│  serve  │ │
//!     TOML file       │  │ resolve │    │  machine  │    │sessions │ │
//!                     │  └─────────┘    └─────┬─────┘    └────┬────┘ │
//!                     │                       │               │      │
//!                     │                       ▼               ▼      │
//!                     │                 ┌──────────┐    ┌──────────┐ │
//!                     │                 │ storage  │    │  stats / │ │
//!                     │                 │ registry │    │  monitor │ │
//!                     │                 └──────────┘    └──────────┘ │
//!                     │                                               │
//!                     │  ┌─────────────────────────────────────────┐ │
//!                     │  │          Cross-Cutting Concerns         │ │
//!                     │  │  ┌─────────┐  ┌─────────┐  ┌──────────┐ │ │
//!                     │  │  │ logging │  │ signals │  │ shutdown │ │ │
//!                     │  │  └─────────┘  └─────────┘  └──────────┘ │ │
//!                     │  └─────────────────────────────────────────┘ │
//!                     └───────────────────────────────────────────────┘
//! ```
//!
//! # Startup Sequence
//!
//! 1. Resolve options from flags and the optional TOML config
//! 2. Initialize logging (stderr or a reopenable file)
//! 3. Probe the listen address; refuse to start if it is taken
//! 4. Open storages, arm signal handlers, serve until stopped
//! 5. Tear down storages and socket files on every exit path

use std::process::ExitCode;

use clap::Parser;

use stashd::config::options::{resolve, Args, UsageError};
use stashd::lifecycle::{ServerError, StashServer};
use stashd::observability::logging::{self, emit_exception};
use stashd::serve::StorageService;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let options = match resolve(args) {
        Ok(options) => options,
        Err(e) => return usage_exit(&e),
    };

    let log = match logging::init(&options.log) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("stashd: error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        address = %options.address,
        storages = options.storages.len(),
        read_only = options.read_only,
        "stashd starting"
    );

    let server = StashServer::new(options, log);
    let mut service = StorageService::new();

    match server.run(&mut service).await {
        Ok(()) => {
            tracing::info!("stashd stopped");
            ExitCode::SUCCESS
        }
        Err(ServerError::Usage(e)) => usage_exit(&e),
        Err(e) => {
            emit_exception("server fault", &e);
            ExitCode::FAILURE
        }
    }
}

/// Operator mistakes exit 2, matching what the flag parser does for
/// malformed command lines.
fn usage_exit(error: &UsageError) -> ExitCode {
    eprintln!("stashd: error: {error}");
    ExitCode::from(2)
}
