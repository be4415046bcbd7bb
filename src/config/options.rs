//! Invocation options and the resolver that merges them into a
//! [`ResolvedOptions`] record.
//!
//! # Responsibilities
//! - Define the CLI surface (clap derive)
//! - Merge direct flags with config-file settings; flags win
//! - Synthesize file StorageSpecs from repeated `-f` flags, named "1", "2", …
//! - Reject unusable invocations with an operator-facing `UsageError`

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::config::address::{AddressError, ListenAddr};
use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{LogConfig, StashConfig, StorageKind};
use crate::storage::backend::StorageOpener;
use crate::storage::file::FileOpener;
use crate::storage::memory::MemoryOpener;

/// Operator-facing startup error. Printed to stderr; the process exits
/// non-zero with minimal or no side effects.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("no server address specified; use -a or -C")]
    MissingAddress,

    #[error("no storages specified; use -f or -C")]
    MissingStorages,

    #[error("address {0} already in use")]
    AddressInUse(String),

    #[error("storage {0:?} has no path")]
    StorageWithoutPath(String),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Command-line arguments. Positional arguments are not supported; clap
/// rejects them with its own usage error.
#[derive(Debug, Parser)]
#[command(name = "stashd", about = "Serve a set of storages over a socket", long_about = None)]
pub struct Args {
    /// TOML configuration file.
    #[arg(short = 'C', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Server address: PORT, HOST:PORT, or a path containing '/'.
    #[arg(short = 'a', long = "address", value_name = "ADDR")]
    pub address: Option<String>,

    /// File storage to serve. Repeatable; storages are named "1", "2", …
    /// in the order given.
    #[arg(short = 'f', long = "filename", value_name = "PATH")]
    pub filenames: Vec<PathBuf>,

    /// Monitor address: PORT, HOST:PORT, or a path containing '/'.
    #[arg(short = 'm', long = "monitor", value_name = "ADDR")]
    pub monitor: Option<String>,

    /// Serve every storage read-only.
    #[arg(long)]
    pub read_only: bool,
}

/// Declarative description of one storage to be opened at startup.
pub struct StorageSpec {
    /// Registry name, unique within one [`ResolvedOptions`].
    pub name: String,
    /// Capability that opens the backend.
    pub opener: Box<dyn StorageOpener>,
}

impl fmt::Debug for StorageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSpec")
            .field("name", &self.name)
            .field("kind", &self.opener.kind())
            .finish()
    }
}

/// Fully validated, immutable options driving the server lifecycle.
#[derive(Debug)]
pub struct ResolvedOptions {
    pub address: ListenAddr,
    pub storages: Vec<StorageSpec>,
    pub read_only: bool,
    pub invalidation_queue_size: usize,
    pub transaction_timeout: Option<Duration>,
    pub monitor: Option<ListenAddr>,
    pub max_connections: usize,
    pub log: LogConfig,
}

/// Merge CLI flags with the config file (if any) into resolved options.
///
/// Flags win over config-file values: `-a` replaces the configured
/// address, `-f` replaces the configured storage list wholesale, `-m`
/// replaces the configured monitor.
pub fn resolve(args: Args) -> Result<ResolvedOptions, UsageError> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => StashConfig::default(),
    };

    let address = match args.address.as_deref().or(config.server.address.as_deref()) {
        Some(text) => ListenAddr::parse(text)?,
        None => return Err(UsageError::MissingAddress),
    };

    let monitor = match args.monitor.as_deref().or(config.server.monitor.as_deref()) {
        Some(text) => Some(ListenAddr::parse(text)?),
        None => None,
    };

    let storages = if args.filenames.is_empty() {
        configured_storages(&config)?
    } else {
        direct_storages(&args.filenames)
    };
    if storages.is_empty() {
        return Err(UsageError::MissingStorages);
    }

    Ok(ResolvedOptions {
        address,
        storages,
        read_only: args.read_only || config.server.read_only,
        invalidation_queue_size: config.server.invalidation_queue_size,
        transaction_timeout: config
            .server
            .transaction_timeout_secs
            .map(Duration::from_secs),
        monitor,
        max_connections: config.server.max_connections,
        log: config.log,
    })
}

/// One file StorageSpec per `-f` occurrence, named sequentially from "1".
fn direct_storages(filenames: &[PathBuf]) -> Vec<StorageSpec> {
    filenames
        .iter()
        .enumerate()
        .map(|(i, path)| StorageSpec {
            name: (i + 1).to_string(),
            opener: Box::new(FileOpener::new(path.clone())),
        })
        .collect()
}

/// StorageSpecs from `[[storage]]` sections, in declaration order.
/// Unnamed sections get their 1-based position as name.
fn configured_storages(config: &StashConfig) -> Result<Vec<StorageSpec>, UsageError> {
    let mut specs = Vec::with_capacity(config.storage.len());
    for (i, section) in config.storage.iter().enumerate() {
        let name = section
            .name
            .clone()
            .unwrap_or_else(|| (i + 1).to_string());
        tracing::debug!(name = %name, kind = section.kind.as_str(), "configured storage");
        let opener: Box<dyn StorageOpener> = match section.kind {
            StorageKind::File => {
                // Validation guarantees a path for file storages.
                let path = section
                    .path
                    .clone()
                    .ok_or_else(|| UsageError::StorageWithoutPath(name.clone()))?;
                Box::new(FileOpener::new(path))
            }
            StorageKind::Memory => Box::new(MemoryOpener::new()),
        };
        specs.push(StorageSpec { name, opener });
    }
    Ok(specs)
}
