//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check addresses parse into one of the accepted forms
//! - Check storage names are unique and file storages have paths
//! - Check the log level is a known severity
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: StashConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the system

use thiserror::Error;

use crate::config::address::ListenAddr;
use crate::config::schema::{StashConfig, StorageKind};
use crate::observability::logging::Severity;

/// A single semantic problem found in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.address: {0}")]
    Address(crate::config::address::AddressError),

    #[error("server.monitor: {0}")]
    Monitor(crate::config::address::AddressError),

    #[error("server.invalidation_queue_size must be at least 1")]
    ZeroQueueSize,

    #[error("duplicate storage name {0:?}")]
    DuplicateStorageName(String),

    #[error("storage {0:?} is a file storage but has no path")]
    MissingStoragePath(String),

    #[error("log.level: unknown severity {0:?}")]
    UnknownLogLevel(String),
}

/// Check everything serde cannot. Collects every error rather than
/// stopping at the first so an operator can fix a config in one pass.
pub fn validate_config(config: &StashConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(text) = &config.server.address {
        if let Err(e) = ListenAddr::parse(text) {
            errors.push(ValidationError::Address(e));
        }
    }

    if let Some(text) = &config.server.monitor {
        if let Err(e) = ListenAddr::parse(text) {
            errors.push(ValidationError::Monitor(e));
        }
    }

    if config.server.invalidation_queue_size == 0 {
        errors.push(ValidationError::ZeroQueueSize);
    }

    let mut seen = Vec::new();
    for (i, storage) in config.storage.iter().enumerate() {
        let name = storage
            .name
            .clone()
            .unwrap_or_else(|| (i + 1).to_string());

        if seen.contains(&name) {
            errors.push(ValidationError::DuplicateStorageName(name.clone()));
        }
        seen.push(name.clone());

        if storage.kind == StorageKind::File && storage.path.is_none() {
            errors.push(ValidationError::MissingStoragePath(name));
        }
    }

    if config.log.level.parse::<Severity>().is_err() {
        errors.push(ValidationError::UnknownLogLevel(config.log.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StorageConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&StashConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = StashConfig::default();
        config.server.address = Some("not-an-address".to_string());
        config.server.invalidation_queue_size = 0;
        config.log.level = "verbose".to_string();
        config.storage = vec![
            StorageConfig {
                name: Some("a".to_string()),
                kind: StorageKind::File,
                path: None,
            },
            StorageConfig {
                name: Some("a".to_string()),
                kind: StorageKind::Memory,
                path: None,
            },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "expected four distinct errors: {errors:?}");
    }

    #[test]
    fn positional_names_participate_in_uniqueness() {
        let mut config = StashConfig::default();
        // The unnamed second section defaults to "2", colliding with the
        // explicitly named first one.
        config.storage = vec![
            StorageConfig {
                name: Some("2".to_string()),
                kind: StorageKind::Memory,
                path: None,
            },
            StorageConfig {
                name: None,
                kind: StorageKind::Memory,
                path: None,
            },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::DuplicateStorageName(ref n) if n == "2"
        ));
    }

    #[test]
    fn monitor_address_is_checked() {
        let mut config = StashConfig::default();
        config.server.monitor = Some("nope".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::Monitor(_)));
    }
}
