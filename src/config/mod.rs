//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! CLI args (clap) ──────────────┐
//!                               ├─▶ options.rs resolve()
//! TOML file                     │        │
//!     → loader.rs (parse)       │        ▼
//!     → validation.rs (checks) ─┘   ResolvedOptions (validated, immutable)
//!                                        │
//!                                        ▼
//!                                   lifecycle manager
//! ```
//!
//! # Design Decisions
//! - Options are immutable once resolved; there is no runtime reload
//! - Direct flags win over config-file values
//! - All config-file fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks and
//!   reports every semantic error, not just the first

pub mod address;
pub mod loader;
pub mod options;
pub mod schema;
pub mod validation;

pub use address::ListenAddr;
pub use options::{Args, ResolvedOptions, StorageSpec, UsageError};
pub use schema::StashConfig;
