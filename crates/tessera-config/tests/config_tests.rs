//! Configuration loading and conversion tests

use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tessera_config::{ConfigError, ConfigLoader, CONFIG_FILE_NAME};
use tessera_core::{RunConfigOverrides, Tag, TagFilter, Timeout};

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join(CONFIG_FILE_NAME);
    fs::write(&config_path, content).unwrap();
    config_path
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_full_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
[discovery]
scopes = ["target/tessera", "/opt/shared/tessera"]
exclude-namespaces = ["vendored"]
index-timeout-secs = 90

[tags]
exclude = ["slow"]

[defaults]
invocations = 3
timeout-ms = 1500
tags = ["unit"]
"#,
    );

    let config = ConfigLoader::new().without_env().load_from_file(&path).unwrap();

    let request = config.discovery_request();
    assert_eq!(
        request.search_scopes,
        vec![
            temp_dir.path().join("target/tessera"),
            PathBuf::from("/opt/shared/tessera")
        ]
    );
    assert!(request.explicit_names.is_empty());

    let options = config.discovery_options();
    assert_eq!(options.index_timeout, Duration::from_secs(90));
    assert!(options.denylist().contains("vendored"));

    let selection = config.tag_selection();
    let slow: BTreeSet<Tag> = [Tag::from("slow")].into_iter().collect();
    assert!(!selection.is_active(&slow));
    assert!(selection.is_active(&BTreeSet::new()));
}

#[test]
fn test_defaults_form_the_base_run_config() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[defaults]
threads = 4
timeout-ms = 200
"#,
    );

    let config = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();
    let base = config.base_run_config();
    let run_config = base.merge(&RunConfigOverrides::new().invocations(2).threads(1));

    assert_eq!(base.threads(), 4);
    assert_eq!(run_config.threads(), 1);
    assert_eq!(run_config.invocations(), 2);
    assert_eq!(run_config.timeout(), Timeout::from_millis(200));
    assert!(run_config.enabled());
}

#[test]
fn test_explicit_containers_flow_into_request() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[discovery]
scopes = ["target/tessera"]
containers = ["acme::AlphaSpec"]
"#,
    );

    let config = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();

    let request = config.discovery_request();
    assert!(request.is_explicit());
    assert_eq!(request.explicit_names, vec!["acme::AlphaSpec".to_string()]);
}

// ============================================================================
// Invalid Config Tests
// ============================================================================

#[test]
fn test_invalid_toml_syntax() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[discovery\nscopes = [");

    let result = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path());
    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .without_env()
        .load_from_file(&temp_dir.path().join(CONFIG_FILE_NAME));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[rstest]
#[case("[defaults]\ninvocations = 0\n", "defaults.invocations")]
#[case("[defaults]\nthreads = 0\n", "defaults.threads")]
#[case("[defaults]\ntimeout-ms = 0\n", "defaults.timeout-ms")]
#[case("[discovery]\nindex-timeout-secs = 0\n", "discovery.index-timeout-secs")]
#[case("[discovery]\ncontainers = [\" \"]\n", "discovery.containers")]
#[case("[tags]\ninclude = [\"db\"]\nexclude = [\"db\"]\n", "tags")]
fn test_invalid_values(#[case] content: &str, #[case] expected_field: &str) {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), content);

    match ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path())
    {
        Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected_field),
        other => panic!("expected invalid value error, got {:?}", other.map(|_| ())),
    }
}

// ============================================================================
// Environment overrides
// ============================================================================

#[test]
#[serial]
fn test_env_containers_override_scopes() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[discovery]
scopes = ["target/tessera"]
"#,
    );

    env::set_var("TESSERA_CONTAINERS", "acme::BetaSpec, acme::AlphaSpec,");
    let result = ConfigLoader::new().load_from_directory(temp_dir.path());
    env::remove_var("TESSERA_CONTAINERS");

    let request = result.unwrap().discovery_request();
    assert_eq!(
        request.explicit_names,
        vec!["acme::BetaSpec".to_string(), "acme::AlphaSpec".to_string()]
    );
}

#[test]
#[serial]
fn test_env_index_timeout() {
    let temp_dir = TempDir::new().unwrap();

    env::set_var("TESSERA_INDEX_TIMEOUT_SECS", "15");
    let result = ConfigLoader::new().load_from_directory(temp_dir.path());
    env::remove_var("TESSERA_INDEX_TIMEOUT_SECS");

    assert_eq!(
        result.unwrap().discovery_options().index_timeout,
        Duration::from_secs(15)
    );
}

#[test]
#[serial]
fn test_env_ignored_when_disabled() {
    let temp_dir = TempDir::new().unwrap();

    env::set_var("TESSERA_TAGS_EXCLUDE", "slow");
    let result = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path());
    env::remove_var("TESSERA_TAGS_EXCLUDE");

    let selection = result.unwrap().tag_selection();
    assert!(selection.exclude().is_empty());
}
