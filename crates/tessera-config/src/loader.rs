//! Configuration Loader
//!
//! Handles loading configuration and applying environment overrides with proper precedence.

use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tessera_core::{DiscoveryOptions, DiscoveryRequest, RunConfig, TagSelection};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "tessera.toml";

/// Comma-separated tags that must be present (`fast,db`)
pub const ENV_TAGS_INCLUDE: &str = "TESSERA_TAGS_INCLUDE";
/// Comma-separated tags that must be absent
pub const ENV_TAGS_EXCLUDE: &str = "TESSERA_TAGS_EXCLUDE";
/// Comma-separated explicit container names
pub const ENV_CONTAINERS: &str = "TESSERA_CONTAINERS";
/// Indexing ceiling in seconds
pub const ENV_INDEX_TIMEOUT_SECS: &str = "TESSERA_INDEX_TIMEOUT_SECS";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Project config (./tessera.toml) - lowest priority
/// 2. Environment variables (TESSERA_*) - overrides project
pub struct ConfigLoader {
    /// Whether TESSERA_* variables are consulted
    use_env: bool,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Project root directory (where tessera.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { use_env: true }
    }

    /// Ignore environment variables
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find tessera.toml.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let project = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project,
            project_root: config_path.parent().map(|p| p.to_path_buf()),
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); default config if none is found
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "loading project config");
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides to project config
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if !self.use_env {
            return Ok(config);
        }

        let mut overrides = ProjectConfig::default();

        // A set but empty variable clears the file's list
        let include = env::var(ENV_TAGS_INCLUDE)
            .ok()
            .map(|value| TagSelection::parse_list(&value));
        let exclude = env::var(ENV_TAGS_EXCLUDE)
            .ok()
            .map(|value| TagSelection::parse_list(&value));

        if let Ok(containers) = env::var(ENV_CONTAINERS) {
            overrides.discovery.containers = containers
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(secs) = env::var(ENV_INDEX_TIMEOUT_SECS) {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                ConfigError::invalid_value(ENV_INDEX_TIMEOUT_SECS, e.to_string())
            })?;
            overrides.discovery.index_timeout_secs = Some(secs);
        }

        config.merge(&overrides);
        if let Some(include) = include {
            config.tags.include = include;
        }
        if let Some(exclude) = exclude {
            config.tags.exclude = exclude;
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has tessera.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Discovery request with scopes resolved against the project root
    pub fn discovery_request(&self) -> DiscoveryRequest {
        let search_scopes = self
            .project
            .discovery
            .scopes
            .iter()
            .map(|scope| match self.project_root() {
                Some(root) if scope.is_relative() => root.join(scope),
                _ => scope.clone(),
            })
            .collect();

        DiscoveryRequest {
            search_scopes,
            explicit_names: self.project.discovery.containers.clone(),
        }
    }

    pub fn tag_selection(&self) -> TagSelection {
        TagSelection::new(
            self.project.tags.include.iter().cloned(),
            self.project.tags.exclude.iter().cloned(),
        )
    }

    /// Base run config for every unit: built-in defaults with `[defaults]`
    /// applied. Units layer their own settings on top of it.
    pub fn base_run_config(&self) -> RunConfig {
        RunConfig::default().merge(&self.project.defaults.to_overrides())
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        let mut options = DiscoveryOptions::default();
        if let Some(secs) = self.project.discovery.index_timeout_secs {
            options = options.with_index_timeout(Duration::from_secs(secs));
        }
        for namespace in &self.project.discovery.exclude_namespaces {
            options = options.with_excluded_namespace(namespace.clone());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;
    use tessera_core::{Tag, TagFilter};

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[discovery]
scopes = ["target/tessera"]
"#,
        );

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(&sub_dir)
            .unwrap();

        assert_eq!(config.project_root(), Some(temp_dir.path()));
        assert_eq!(
            config.discovery_request().search_scopes,
            vec![temp_dir.path().join("target/tessera")]
        );
    }

    #[test]
    fn test_no_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert!(!config.is_project());
        assert!(config.discovery_request().search_scopes.is_empty());
        assert!(config.project.defaults.to_overrides().is_empty());
        assert_eq!(config.base_run_config().invocations(), 1);
    }

    #[test]
    #[serial]
    fn test_env_overrides_tags() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[tags]
include = ["fast"]
"#,
        );

        env::set_var(ENV_TAGS_INCLUDE, "db, nightly");
        env::set_var(ENV_TAGS_EXCLUDE, "slow");

        let config = ConfigLoader::new()
            .load_from_directory(temp_dir.path())
            .unwrap();
        let selection = config.tag_selection();

        env::remove_var(ENV_TAGS_INCLUDE);
        env::remove_var(ENV_TAGS_EXCLUDE);

        let tags = |names: &[&str]| names.iter().map(|n| Tag::from(*n)).collect::<BTreeSet<_>>();
        assert!(selection.is_active(&tags(&["db"])));
        assert!(!selection.is_active(&tags(&["fast"])));
        assert!(!selection.is_active(&tags(&["db", "slow"])));
    }

    #[test]
    #[serial]
    fn test_empty_env_clears_file_tags() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[tags]
include = ["fast"]
exclude = ["slow"]
"#,
        );

        env::set_var(ENV_TAGS_INCLUDE, "");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var(ENV_TAGS_INCLUDE);

        let selection = result.unwrap().tag_selection();
        assert!(selection.include().is_empty());
        assert!(selection.exclude().contains(&Tag::from("slow")));
        assert!(selection.is_active(&BTreeSet::new()));
    }

    #[test]
    #[serial]
    fn test_env_invalid_timeout() {
        let temp_dir = TempDir::new().unwrap();
        env::set_var(ENV_INDEX_TIMEOUT_SECS, "soon");

        let result = ConfigLoader::new().load_from_directory(temp_dir.path());

        env::remove_var(ENV_INDEX_TIMEOUT_SECS);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
