//! Tests for bootstrap configuration resolution
//!
//! Covers config file priority, table map path priority, and credential
//! resolution. Tests that touch environment variables are marked #[serial]
//! so they never race each other.

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use yobot_common::config::{
    load_toml_config, resolve_airtable_token, resolve_config_path, resolve_tables_path,
    ConfigSource, TomlConfig, CONFIG_ENV_VAR, LEGACY_TOKEN_ENV_VAR, TABLES_ENV_VAR, TOKEN_ENV_VAR,
};
use yobot_common::Error;

fn clear_env() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var(TABLES_ENV_VAR);
    env::remove_var(TOKEN_ENV_VAR);
    env::remove_var(LEGACY_TOKEN_ENV_VAR);
}

fn write_toml(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_cli_config_path_wins_over_env() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/yobot-env.toml");

    let (path, source) = resolve_config_path(Some(Path::new("/tmp/yobot-cli.toml"))).unwrap();
    assert_eq!(path, PathBuf::from("/tmp/yobot-cli.toml"));
    assert_eq!(source, ConfigSource::CommandLine);

    clear_env();
}

#[test]
#[serial]
fn test_env_config_path_used_without_cli() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/yobot-env.toml");

    let (path, source) = resolve_config_path(None).unwrap();
    assert_eq!(path, PathBuf::from("/tmp/yobot-env.toml"));
    assert_eq!(source, ConfigSource::Environment);

    clear_env();
}

#[test]
#[serial]
fn test_explicit_missing_config_is_fatal() {
    clear_env();
    let result = load_toml_config(Some(Path::new("/nonexistent/yobot/yobot.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_load_toml_from_cli_path() {
    clear_env();
    let file = write_toml("[server]\nport = 6100\n\n[logging]\nlevel = \"debug\"\n");

    let config = load_toml_config(Some(file.path())).unwrap();
    assert_eq!(config.server.port, 6100);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_malformed_toml_file_is_fatal() {
    clear_env();
    let file = write_toml("[server\nport = ");

    let result = load_toml_config(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_tables_path_priority() {
    clear_env();
    let config = TomlConfig::from_toml_str("tables_path = \"/srv/toml-tables.json\"\n").unwrap();

    // TOML beats the built-in default
    assert_eq!(
        resolve_tables_path(None, &config),
        PathBuf::from("/srv/toml-tables.json")
    );

    // Environment beats TOML
    env::set_var(TABLES_ENV_VAR, "/srv/env-tables.json");
    assert_eq!(
        resolve_tables_path(None, &config),
        PathBuf::from("/srv/env-tables.json")
    );

    // Command line beats environment
    assert_eq!(
        resolve_tables_path(Some(Path::new("/srv/cli-tables.json")), &config),
        PathBuf::from("/srv/cli-tables.json")
    );

    clear_env();
    assert_eq!(
        resolve_tables_path(None, &TomlConfig::default()),
        PathBuf::from("tables.json")
    );
}

#[test]
#[serial]
fn test_token_env_takes_precedence_over_toml() {
    clear_env();
    let config = TomlConfig::from_toml_str("[airtable]\ntoken = \"toml-token\"\n").unwrap();

    env::set_var(TOKEN_ENV_VAR, "env-token");
    assert_eq!(resolve_airtable_token(&config).unwrap(), "env-token");

    clear_env();
}

#[test]
#[serial]
fn test_token_legacy_env_var() {
    clear_env();
    env::set_var(LEGACY_TOKEN_ENV_VAR, "legacy-token");

    assert_eq!(
        resolve_airtable_token(&TomlConfig::default()).unwrap(),
        "legacy-token"
    );

    clear_env();
}

#[test]
#[serial]
fn test_token_from_toml() {
    clear_env();
    let config = TomlConfig::from_toml_str("[airtable]\ntoken = \"toml-token\"\n").unwrap();
    assert_eq!(resolve_airtable_token(&config).unwrap(), "toml-token");
}

#[test]
#[serial]
fn test_missing_token_is_fatal() {
    clear_env();
    // Whitespace-only values count as missing
    env::set_var(TOKEN_ENV_VAR, "   ");
    let config = TomlConfig::from_toml_str("[airtable]\ntoken = \"\"\n").unwrap();

    let result = resolve_airtable_token(&config);
    assert!(matches!(result, Err(Error::MissingCredential(_))));

    clear_env();
}

#[test]
#[serial]
fn test_demo_config_parses() {
    clear_env();
    let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../demos/yobot.toml"));

    let config = load_toml_config(Some(path)).expect("Demo config should load");
    assert_eq!(config.tables_path, Some(PathBuf::from("demos/tables.json")));
    assert_eq!(config.server.port, 5730);
    assert_eq!(config.retry.max_attempts, 3);
}
