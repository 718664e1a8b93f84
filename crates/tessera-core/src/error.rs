//! Discovery and run-configuration error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Fatal discovery-time errors. Any of these aborts the whole discovery call.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to read search scope {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Container not found: {name}")]
    ContainerNotFound { name: String },

    #[error("Indexing search scopes exceeded the {limit:?} ceiling")]
    IndexTimeout { limit: Duration },

    #[error("Invalid manifest at {path}: {error}")]
    InvalidManifest { path: PathBuf, error: String },

    #[error("Container '{name}' cannot be instantiated: {reason}")]
    NotInstantiable { name: String, reason: String },

    #[error("Indexing worker failed: {0}")]
    WorkerFailed(String),
}

impl DiscoveryError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a container not found error
    pub fn container_not_found(name: impl Into<String>) -> Self {
        Self::ContainerNotFound { name: name.into() }
    }

    /// Create an invalid manifest error
    pub fn invalid_manifest(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create a not instantiable error
    pub fn not_instantiable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotInstantiable {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Caller-side validation failure for a [`RunConfig`](crate::RunConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRunConfig {
    #[error("invocations must be at least 1")]
    ZeroInvocations,

    #[error("threads must be at least 1")]
    ZeroThreads,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}
