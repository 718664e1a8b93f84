//! Project Configuration (tessera.toml)
//!
//! Handles project-level configuration stored in `tessera.toml` at the project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tessera_core::{RunConfigOverrides, Tag, Timeout};

/// Project configuration from tessera.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Where and what to discover
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Tag selection
    #[serde(default)]
    pub tags: TagsConfig,

    /// Base run configuration for every unit
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    /// Search scopes, relative to the project root
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<PathBuf>,

    /// Explicit container names; replace scope search when non-empty
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<String>,

    /// Root namespaces to exclude in addition to the platform ones
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_namespaces: Vec<String>,

    /// Ceiling for scope indexing (default: 3600)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_timeout_secs: Option<u64>,
}

/// Tag selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TagsConfig {
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub include: BTreeSet<Tag>,

    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub exclude: BTreeSet<Tag>,
}

/// Base run configuration units start from; unset fields keep the built-in
/// defaults and a unit's own settings always take precedence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocations: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,

    /// Per-invocation timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<Tag>>,
}

impl DefaultsConfig {
    /// Sparse overrides for [`tessera_core::RunConfig::merge`]
    pub fn to_overrides(&self) -> RunConfigOverrides {
        RunConfigOverrides {
            enabled: self.enabled,
            invocations: self.invocations,
            timeout: self.timeout_ms.map(Timeout::from_millis),
            threads: self.threads,
            tags: self.tags.clone(),
            interceptors: None,
        }
    }
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.discovery.index_timeout_secs == Some(0) {
            return Err(ConfigError::invalid_value(
                "discovery.index-timeout-secs",
                "timeout must be greater than zero",
            ));
        }

        if let Some(name) = self
            .discovery
            .containers
            .iter()
            .find(|name| name.trim().is_empty())
        {
            return Err(ConfigError::invalid_value(
                "discovery.containers",
                format!("invalid container name '{}'", name),
            ));
        }

        if let Some(tag) = self.tags.include.intersection(&self.tags.exclude).next() {
            return Err(ConfigError::invalid_value(
                "tags",
                format!("tag '{}' is both included and excluded", tag),
            ));
        }

        if self.defaults.invocations == Some(0) {
            return Err(ConfigError::invalid_value(
                "defaults.invocations",
                "must be at least 1",
            ));
        }
        if self.defaults.threads == Some(0) {
            return Err(ConfigError::invalid_value(
                "defaults.threads",
                "must be at least 1",
            ));
        }
        if self.defaults.timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value(
                "defaults.timeout-ms",
                "timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Merge another project config into this one.
    /// Other config takes precedence for non-empty values.
    pub fn merge(&mut self, other: &ProjectConfig) {
        if !other.discovery.scopes.is_empty() {
            self.discovery.scopes = other.discovery.scopes.clone();
        }
        if !other.discovery.containers.is_empty() {
            self.discovery.containers = other.discovery.containers.clone();
        }
        self.discovery
            .exclude_namespaces
            .extend(other.discovery.exclude_namespaces.iter().cloned());
        if other.discovery.index_timeout_secs.is_some() {
            self.discovery.index_timeout_secs = other.discovery.index_timeout_secs;
        }
        if !other.tags.include.is_empty() {
            self.tags.include = other.tags.include.clone();
        }
        if !other.tags.exclude.is_empty() {
            self.tags.exclude = other.tags.exclude.clone();
        }

        let defaults = &other.defaults;
        self.defaults.enabled = defaults.enabled.or(self.defaults.enabled);
        self.defaults.invocations = defaults.invocations.or(self.defaults.invocations);
        self.defaults.threads = defaults.threads.or(self.defaults.threads);
        self.defaults.timeout_ms = defaults.timeout_ms.or(self.defaults.timeout_ms);
        if defaults.tags.is_some() {
            self.defaults.tags = defaults.tags.clone();
        }
    }
}
