//! The named set of open storage backends.
//!
//! Populated once during startup, drained once during shutdown; between
//! the two the registry is read-only. Both mutations happen on the
//! lifecycle manager's single control task, so no locking is needed.

use thiserror::Error;

use crate::config::options::StorageSpec;
use crate::observability::logging::emit_exception;
use crate::storage::backend::{Storage, StorageError};

/// Error from [`StorageRegistry::open_all`], naming the storage that
/// failed.
#[derive(Debug, Error)]
#[error("failed to open storage {name:?}: {source}")]
pub struct StorageOpenError {
    pub name: String,
    #[source]
    pub source: StorageError,
}

struct StorageEntry {
    name: String,
    storage: Box<dyn Storage>,
}

/// Mapping from storage name to its open handle.
#[derive(Default)]
pub struct StorageRegistry {
    entries: Vec<StorageEntry>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every spec's storage in declaration order.
    ///
    /// Fails fast on the first open error. Storages opened before the
    /// failing one stay in the registry; the caller's teardown closes
    /// them. There is deliberately no per-storage rollback here; the
    /// lifecycle manager owns the single cleanup path.
    pub fn open_all(&mut self, specs: &[StorageSpec]) -> Result<(), StorageOpenError> {
        for spec in specs {
            tracing::info!(
                name = %spec.name,
                kind = spec.opener.kind(),
                "opening storage"
            );
            let storage = spec.opener.open().map_err(|source| StorageOpenError {
                name: spec.name.clone(),
                source,
            })?;
            self.entries.push(StorageEntry {
                name: spec.name.clone(),
                storage,
            });
        }
        Ok(())
    }

    /// Close every handle, best-effort: a failed close is logged with its
    /// error chain and the remaining handles still close. Draining means
    /// a second call finds the registry empty and does nothing.
    pub fn close_all(&mut self) {
        for mut entry in self.entries.drain(..) {
            tracing::info!(name = %entry.name, "closing storage");
            if let Err(e) = entry.storage.close() {
                emit_exception(&format!("failed to close storage {:?}", entry.name), &e);
            }
        }
    }

    /// Names of the open storages, in open order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }
}
