//! Tessera Configuration System
//!
//! Loads the project configuration file (`tessera.toml`) that drives a test
//! run:
//! - Discovery settings (search scopes, explicit containers, namespace denylist, indexing ceiling)
//! - Tag selection (include/exclude lists)
//! - Default run configuration applied to every unit
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones:
//! 1. Project config (nearest `tessera.toml` walking up from the start directory)
//! 2. Environment variables (`TESSERA_*`)
//!
//! # Example
//!
//! ```no_run
//! use tessera_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! let request = config.discovery_request();
//! ```

pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader, CONFIG_FILE_NAME};
pub use project::{DefaultsConfig, DiscoveryConfig, ProjectConfig, TagsConfig};
