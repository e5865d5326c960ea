//! Tests for configuration discovery and root folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate ECHOTAG_* variables are marked with #[serial].

use echotag_common::config::{
    load_toml_config, locate_config_file, prepare_root_folder, resolve_root_folder, DATABASE_FILE,
};
use echotag_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SampleConfig {
    root_folder: Option<String>,
    #[serde(default)]
    server: SampleServer,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SampleServer {
    bind_addr: Option<String>,
}

#[test]
#[serial]
fn test_env_var_overrides_toml_root_folder() {
    env::set_var("ECHOTAG_TEST_ROOT", "/tmp/from-env");

    let resolved = resolve_root_folder(None, "ECHOTAG_TEST_ROOT", Some("/tmp/from-toml"));
    assert_eq!(resolved, PathBuf::from("/tmp/from-env"));

    env::remove_var("ECHOTAG_TEST_ROOT");
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var("ECHOTAG_TEST_ROOT", "   ");

    let resolved = resolve_root_folder(None, "ECHOTAG_TEST_ROOT", Some("/tmp/from-toml"));
    assert_eq!(resolved, PathBuf::from("/tmp/from-toml"));

    env::remove_var("ECHOTAG_TEST_ROOT");
}

#[test]
#[serial]
fn test_no_overrides_uses_platform_default() {
    env::remove_var("ECHOTAG_TEST_ROOT");

    let resolved = resolve_root_folder(None, "ECHOTAG_TEST_ROOT", None);
    assert!(resolved.to_string_lossy().contains("echotag"));
}

#[test]
#[serial]
fn test_locate_config_prefers_cli_then_env() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cli_path = temp_dir.path().join("cli.toml");
    let env_path = temp_dir.path().join("env.toml");

    env::set_var("ECHOTAG_TEST_CONFIG", env_path.to_str().unwrap());

    let found = locate_config_file(Some(&cli_path), "ECHOTAG_TEST_CONFIG", "echotag-test.toml");
    assert_eq!(found, Some(cli_path));

    let found = locate_config_file(None, "ECHOTAG_TEST_CONFIG", "echotag-test.toml");
    assert_eq!(found, Some(env_path));

    env::remove_var("ECHOTAG_TEST_CONFIG");
}

#[test]
fn test_load_toml_config_parses_nested_tables() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("echotag-ed.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/echotag"

[server]
bind_addr = "0.0.0.0:9000"
"#,
    )
    .unwrap();

    let config: SampleConfig = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.root_folder.as_deref(), Some("/srv/echotag"));
    assert_eq!(config.server.bind_addr.as_deref(), Some("0.0.0.0:9000"));
}

#[test]
fn test_load_toml_config_reports_parse_errors() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "root_folder = [unterminated").unwrap();

    let result: Result<SampleConfig, Error> = load_toml_config(Some(&path));
    assert!(matches!(result, Err(Error::TomlParse { .. })));
}

#[test]
fn test_load_toml_config_missing_explicit_file_is_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let result: Result<SampleConfig, Error> = load_toml_config(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_prepare_root_folder_creates_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().join("nested").join("root");

    let db_path = prepare_root_folder(&root).unwrap();

    assert!(root.is_dir());
    assert_eq!(db_path, root.join(DATABASE_FILE));
}

#[test]
fn test_prepare_root_folder_rejects_regular_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let file = temp_dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();

    assert!(matches!(prepare_root_folder(&file), Err(Error::Config(_))));
}
