//! Stashd Storage Server Library

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod serve;
pub mod storage;

pub use config::options::{Args, ResolvedOptions};
pub use lifecycle::{Shutdown, StashServer};
pub use serve::StorageService;
