//! In-memory storage, for tests and scratch configs.

use crate::storage::backend::{Storage, StorageError, StorageOpener};

/// Opener for in-memory stores. Opening never fails.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener;

impl MemoryOpener {
    pub fn new() -> Self {
        Self
    }
}

impl StorageOpener for MemoryOpener {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn open(&self) -> Result<Box<dyn Storage>, StorageError> {
        Ok(Box::new(MemoryStorage { open: true }))
    }
}

/// An open in-memory store. Contents vanish with the process.
pub struct MemoryStorage {
    open: bool,
}

impl MemoryStorage {
    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.open = false;
        Ok(())
    }
}
