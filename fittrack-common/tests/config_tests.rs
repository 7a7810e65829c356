//! Configuration resolution tests
//!
//! Tests that touch FITTRACK_ROOT are #[serial] so they do not race on the
//! process environment.

use fittrack_common::config::{
    load_config_or_default, load_toml_config, resolve_root_folder, write_toml_config,
    BatchFailurePolicy, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), ROOT_FOLDER_ENV, &config);
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(
        resolve_root_folder(None, ROOT_FOLDER_ENV, &config),
        PathBuf::from("/from/env")
    );

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };
    assert_eq!(
        resolve_root_folder(None, ROOT_FOLDER_ENV, &config),
        PathBuf::from("/from/toml")
    );

    let fallback = resolve_root_folder(None, ROOT_FOLDER_ENV, &TomlConfig::default());
    assert!(fallback.to_string_lossy().contains("fittrack"));
}

#[test]
fn test_write_then_load_preserves_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");

    let mut config = TomlConfig::default();
    config.hevy_api_key = Some("key-123".to_string());
    config.import.batch_size = 50;
    config.import.on_batch_failure = BatchFailurePolicy::Abort;

    write_toml_config(&config, &path).unwrap();
    assert!(!temp_dir.path().join("config.toml.tmp").exists());

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[cfg(unix)]
#[test]
fn test_written_config_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    write_toml_config(&TomlConfig::default(), &path).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_explicit_malformed_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "import = [not valid").unwrap();

    assert!(load_config_or_default(Some(&path)).is_err());
}
