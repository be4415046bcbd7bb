//! File-backed storage.
//!
//! # Responsibilities
//! - Create the data file on first open
//! - Guard the data file with an exclusive `<path>.lock` sibling
//! - Flush and release both on close
//!
//! The lock file is a sentinel: its existence means some process has the
//! storage open. A crash can leave it behind; the open error tells the
//! operator to remove it once no server is running.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::storage::backend::{Storage, StorageError, StorageOpener};

/// Opener for file-backed stores.
#[derive(Debug, Clone)]
pub struct FileOpener {
    path: PathBuf,
}

impl FileOpener {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The data file path this opener targets.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageOpener for FileOpener {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn open(&self) -> Result<Box<dyn Storage>, StorageError> {
        FileStorage::open(&self.path).map(|s| Box::new(s) as Box<dyn Storage>)
    }
}

/// An open file-backed store.
pub struct FileStorage {
    path: PathBuf,
    lock_path: PathBuf,
    data: Option<File>,
}

impl FileStorage {
    fn open(path: &Path) -> Result<Self, StorageError> {
        let lock_path = lock_path_for(path);

        // create_new makes lock acquisition atomic: whoever creates the
        // file owns the storage.
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::Locked { path: lock_path });
            }
            Err(e) => {
                return Err(StorageError::Io {
                    path: lock_path,
                    source: e,
                });
            }
        }

        let data = match OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) => {
                let _ = std::fs::remove_file(&lock_path);
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            lock_path,
            data: Some(data),
        })
    }
}

impl Storage for FileStorage {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn close(&mut self) -> Result<(), StorageError> {
        let Some(data) = self.data.take() else {
            return Ok(());
        };

        data.sync_all().map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        drop(data);

        match std::fs::remove_file(&self.lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: self.lock_path.clone(),
                source,
            }),
        }
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}
