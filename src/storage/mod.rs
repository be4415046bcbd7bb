//! Storage backend subsystem.
//!
//! # Data Flow
//! ```text
//! StorageSpec (name + opener)
//!     → registry.rs open_all (declaration order, fail-fast)
//!     → named handles live in the StorageRegistry while serving
//!     → registry.rs close_all (drain, best-effort per handle)
//! ```
//!
//! # Design Decisions
//! - Backends sit behind the `Storage`/`StorageOpener` traits; the
//!   registry assumes nothing beyond open() and close()
//! - open_all does not roll back storages it already opened; the
//!   lifecycle manager's single teardown path closes them
//! - close_all drains, so a second call is a no-op

pub mod backend;
pub mod file;
pub mod memory;
pub mod registry;

pub use backend::{Storage, StorageError, StorageOpener};
pub use file::FileOpener;
pub use memory::MemoryOpener;
pub use registry::{StorageOpenError, StorageRegistry};
