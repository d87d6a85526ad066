//! Bootstrap configuration and credential resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments (--config, --tables)
//! 2. Environment variables (YOBOT_CONFIG, YOBOT_TABLES, YOBOT_AIRTABLE_TOKEN)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing TOML file is not fatal: the built-in defaults apply. A TOML file
//! that exists but does not parse is fatal, as is a missing credential.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "YOBOT_CONFIG";
/// Environment variable naming the JSON table map
pub const TABLES_ENV_VAR: &str = "YOBOT_TABLES";
/// Preferred environment variable for the Airtable bearer token
pub const TOKEN_ENV_VAR: &str = "YOBOT_AIRTABLE_TOKEN";
/// Legacy token variable still exported by older deployments
pub const LEGACY_TOKEN_ENV_VAR: &str = "AIRTABLE_API_KEY";

/// Table map path used when no other source names one
pub const DEFAULT_TABLES_PATH: &str = "tables.json";
/// Public Airtable REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.airtable.com";

/// Bootstrap configuration loaded from TOML
///
/// Read once at startup. The process must restart to pick up changes.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TomlConfig {
    /// Path to the JSON table map (optional)
    pub tables_path: Option<PathBuf>,

    /// Airtable connection settings
    pub airtable: AirtableConfig,

    /// Retry policy applied by callers that opt into retries
    pub retry: RetryConfig,

    /// Webhook intake server settings
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// How logical field keys without a configured translation are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMode {
    /// Unmapped keys pass through unchanged
    #[default]
    Permissive,
    /// Unmapped keys are rejected
    Strict,
}

/// `[airtable]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AirtableConfig {
    /// REST API root, without the `/v0` suffix
    pub api_url: String,

    /// Bearer token (environment variables take precedence)
    pub token: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    pub field_mode: FieldMode,

    /// Ask Airtable to coerce string values into field types
    pub typecast: bool,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout_secs: 30,
            field_mode: FieldMode::Permissive,
            typecast: false,
        }
    }
}

impl AirtableConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[retry]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first (1 disables retries)
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML file. Fails if the file is unreadable, malformed or invalid.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot work
    pub fn validate(&self) -> Result<()> {
        if self.airtable.timeout_secs == 0 {
            return Err(Error::Config(
                "[airtable] timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a config file path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    UserConfigDir,
}

/// Locate the TOML config file
///
/// Explicit sources (command line, environment) are returned even if the file
/// does not exist so the loader can fail loudly. The per-user location is only
/// returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<(PathBuf, ConfigSource)> {
    if let Some(path) = cli_arg {
        return Some((path.to_path_buf(), ConfigSource::CommandLine));
    }

    if let Some(path) = env_value(CONFIG_ENV_VAR) {
        return Some((PathBuf::from(path), ConfigSource::Environment));
    }

    default_config_path()
        .filter(|p| p.exists())
        .map(|p| (p, ConfigSource::UserConfigDir))
}

/// `~/.config/yobot/yobot.toml` (platform equivalent elsewhere)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("yobot").join("yobot.toml"))
}

/// Load bootstrap configuration, falling back to built-in defaults
pub fn load_toml_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some((path, source)) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {} (from {:?})",
                    path.display(),
                    source
                )));
            }
            let config = TomlConfig::from_path(&path)?;
            info!("Loaded configuration from {} ({:?})", path.display(), source);
            Ok(config)
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Resolve the JSON table map path
///
/// **Priority:** command line → YOBOT_TABLES → TOML `tables_path` → `./tables.json`
pub fn resolve_tables_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Some(path) = env_value(TABLES_ENV_VAR) {
        return PathBuf::from(path);
    }
    if let Some(path) = &config.tables_path {
        return path.clone();
    }
    PathBuf::from(DEFAULT_TABLES_PATH)
}

/// Resolve the Airtable bearer token
///
/// **Priority:** YOBOT_AIRTABLE_TOKEN → AIRTABLE_API_KEY → TOML `airtable.token`
pub fn resolve_airtable_token(config: &TomlConfig) -> Result<String> {
    let candidates = [
        ("YOBOT_AIRTABLE_TOKEN", env_value(TOKEN_ENV_VAR)),
        ("AIRTABLE_API_KEY", env_value(LEGACY_TOKEN_ENV_VAR)),
        (
            "TOML",
            config.airtable.token.clone().filter(|k| is_valid_key(k)),
        ),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, value)| value.is_some())
        .map(|(name, _)| *name)
        .collect();

    if sources.len() > 1 {
        warn!(
            "Airtable token found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (name, value) in candidates {
        if let Some(token) = value {
            info!("Airtable token loaded from {}", name);
            return Ok(token);
        }
    }

    Err(Error::MissingCredential(format!(
        "Airtable token not configured. Set one of:\n\
         1. Environment: {}=your-token\n\
         2. Environment: {}=your-token\n\
         3. TOML config: [airtable] token = \"your-token\"",
        TOKEN_ENV_VAR, LEGACY_TOKEN_ENV_VAR
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_key(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert!(config.tables_path.is_none());
        assert_eq!(config.airtable.api_url, DEFAULT_API_URL);
        assert_eq!(config.airtable.timeout(), Duration::from_secs(30));
        assert_eq!(config.airtable.field_mode, FieldMode::Permissive);
        assert!(!config.airtable.typecast);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.server.port, 5730);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            tables_path = "/etc/yobot/tables.json"

            [airtable]
            timeout_secs = 10
            field_mode = "strict"
            "#,
        )
        .unwrap();

        assert_eq!(config.tables_path, Some(PathBuf::from("/etc/yobot/tables.json")));
        assert_eq!(config.airtable.timeout_secs, 10);
        assert_eq!(config.airtable.field_mode, FieldMode::Strict);
        assert_eq!(config.airtable.api_url, DEFAULT_API_URL);
        assert_eq!(config.retry.initial_backoff_ms, 500);
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let result = TomlConfig::from_toml_str("[airtable\ntimeout_secs = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_field_mode_is_error() {
        let result = TomlConfig::from_toml_str("[airtable]\nfield_mode = \"loose\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let result = TomlConfig::from_toml_str("[airtable]\ntimeout_secs = 0\n");
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("timeout_secs")));
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TomlConfig::from_path(dir.path());
        assert!(matches!(result, Err(Error::Io(_))));

        let result = TomlConfig::from_path(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("patABC.123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
