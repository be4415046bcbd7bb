//! Storage backend abstraction.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file could not be created, read, or flushed.
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another process holds the storage's lock file.
    #[error("{} is locked; is another process serving it?", path.display())]
    Locked { path: PathBuf },
}

/// An opened storage backend. Lives in the registry from startup until
/// shutdown; `close` is called exactly once by the registry drain.
pub trait Storage: Send + Sync {
    /// Backend kind label for logs ("file", "memory").
    fn kind(&self) -> &'static str;

    /// Flush and release the backend. Idempotent.
    fn close(&mut self) -> Result<(), StorageError>;
}

/// Capability to open one storage backend.
pub trait StorageOpener: Send + Sync {
    /// Backend kind label for logs.
    fn kind(&self) -> &'static str;

    /// Open the backend. May be retried after a failed attempt.
    fn open(&self) -> Result<Box<dyn Storage>, StorageError>;
}
