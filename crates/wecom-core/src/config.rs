//! Configuration types and loading for the application.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::paths::{expand_str_path, write_default_config};
use crate::wecom::models::ALL_USERS;
use crate::wecom::text::DEFAULT_MAX_CONTENT_BYTES;
use crate::{AppPaths, env_prefix};

/// Public WeCom API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://qyapi.weixin.qq.com";

/// Default duplicate check window in seconds.
pub const DEFAULT_DUPLICATE_CHECK_INTERVAL: u64 = 600;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(
    title = "Application Configuration",
    description = "Main configuration for the application"
)]
pub struct AppConfig {
    /// JSON Schema reference for editor support.
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub schema: Option<String>,

    /// Active configuration profile.
    #[schemars(default = "default_profile")]
    pub profile: String,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Runtime behavior configuration.
    pub runtime: RuntimeConfig,

    /// Custom paths for state directories.
    pub paths: PathsConfig,

    /// WeCom application credentials and message defaults.
    pub api: ApiConfig,

    /// Recipient aliases.
    /// Maps short names to `|`-joined user ids.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    #[schemars(description = "Recipient aliases. Map short names to user ids joined with '|'.")]
    pub recipients: HashMap<String, String>,
}

fn default_profile() -> String {
    "default".to_string()
}

impl AppConfig {
    /// Override the profile if a value is provided.
    #[must_use]
    pub fn with_profile_override(mut self, profile: Option<String>) -> Self {
        if let Some(profile) = profile {
            self.profile = profile;
        }
        self
    }

    /// Load configuration from file and environment, creating defaults if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed, or written.
    pub fn load(paths: &AppPaths, dry_run: bool) -> Result<Self> {
        if !paths.config_file.exists() {
            if dry_run {
                log::info!(
                    "dry-run: would create default config at {}",
                    paths.config_file.display()
                );
            } else {
                write_default_config(&paths.config_file)?;
            }
        }

        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// Environment variables override file values, e.g. `WECOM_API__SECRET`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn load_from_path(config_file: &Path) -> Result<Self> {
        let env_prefix = env_prefix();
        let built = Config::builder()
            .set_default("profile", "default")?
            .set_default("logging.level", "warn")?
            .set_default("runtime.timeout", 60_i64)?
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("api.corp_id", "")?
            .set_default("api.agent_id", 0_i64)?
            .set_default("api.secret", "")?
            .set_default(
                "api.duplicate_check_interval",
                DEFAULT_DUPLICATE_CHECK_INTERVAL as i64,
            )?
            .set_default("api.max_content_bytes", DEFAULT_MAX_CONTENT_BYTES as i64)?
            .set_default("api.default_recipient", ALL_USERS)?
            .add_source(
                File::from(config_file)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(env_prefix.as_str())
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config: Self = built.try_deserialize()?;

        if let Some(ref file) = config.logging.file {
            let expanded = expand_str_path(file)?;
            config.logging.file = Some(expanded.display().to_string());
        }

        Ok(config)
    }

    /// Copy of the configuration with the secret masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api.secret.is_empty() {
            copy.api.secret = "********".to_string();
        }
        copy
    }
}

impl AppConfig {
    /// Resolve a recipient alias to its user ids.
    /// Returns `None` if no alias matches.
    #[must_use]
    pub fn resolve_alias(&self, name: &str) -> Option<&str> {
        // Exact match first
        if let Some(v) = self.recipients.get(name) {
            return Some(v.as_str());
        }
        // Case-insensitive match
        let lower = name.to_lowercase();
        for (k, v) in &self.recipients {
            if k.to_lowercase() == lower {
                return Some(v.as_str());
            }
        }
        None
    }

    /// Add a recipient alias and write the updated config to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or written.
    pub fn add_alias(config_path: &Path, name: &str, value: &str) -> Result<()> {
        let content = if config_path.exists() {
            std::fs::read_to_string(config_path)?
        } else {
            String::new()
        };

        let mut doc: toml::Table = content.parse().unwrap_or_default();

        let recipients = doc
            .entry("recipients")
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));

        if let toml::Value::Table(tbl) = recipients {
            tbl.insert(name.to_string(), toml::Value::String(value.to_string()));
        }

        let output = toml::to_string_pretty(&doc)?;
        std::fs::write(config_path, output)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: None,
            profile: "default".to_string(),
            logging: LoggingConfig::default(),
            runtime: RuntimeConfig::default(),
            paths: PathsConfig::default(),
            api: ApiConfig::default(),
            recipients: HashMap::new(),
        }
    }
}

/// WeCom application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "WeCom application credentials and message defaults")]
pub struct ApiConfig {
    /// API base URL.
    pub base_url: String,

    /// Corp id (`corpid`), shown under "My Company" in the admin console.
    pub corp_id: String,

    /// Application id (`agentid`).
    pub agent_id: i64,

    /// Application secret (`corpsecret`). Prefer `WECOM_API__SECRET`.
    pub secret: String,

    /// Duplicate check window in seconds; 0 disables the check.
    #[schemars(range(max = 14400))]
    pub duplicate_check_interval: u64,

    /// Chunk size in bytes for split text messages.
    #[schemars(range(min = 1))]
    pub max_content_bytes: usize,

    /// Recipient used when none is given (`@all` for everyone).
    pub default_recipient: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            corp_id: String::new(),
            agent_id: 0,
            secret: String::new(),
            duplicate_check_interval: DEFAULT_DUPLICATE_CHECK_INTERVAL,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            default_recipient: ALL_USERS.to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Logging configuration")]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace).
    #[schemars(default = "default_log_level")]
    pub level: LogLevel,

    /// Optional path for log file output. Supports ~ and environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Log level enumeration for schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only emit error-level messages.
    Error,
    /// Emit warnings and errors (default).
    #[default]
    Warn,
    /// Emit informational messages and above.
    Info,
    /// Emit debug diagnostics and above.
    Debug,
    /// Emit all messages including fine-grained traces.
    Trace,
}

impl LogLevel {
    /// Matching `log` level filter.
    #[must_use]
    pub const fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

const fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            file: None,
        }
    }
}

/// Runtime behavior configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Runtime behavior configuration")]
pub struct RuntimeConfig {
    /// HTTP request timeout in seconds (default: 60).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub timeout: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { timeout: Some(60) }
    }
}

/// Path override configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Custom paths for state directories")]
pub struct PathsConfig {
    /// Directory for state files such as relative log files. Supports ~ and
    /// environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_is_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = AppConfig::load_from_path(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.api.default_recipient, "@all");
        assert_eq!(cfg.api.duplicate_check_interval, 600);
        assert_eq!(cfg.api.max_content_bytes, 2048);
        assert_eq!(cfg.logging.level, LogLevel::Warn);
        assert_eq!(cfg.runtime.timeout, Some(60));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[api]
corp_id = "ww0123"
agent_id = 1000002
secret = "abc"
max_content_bytes = 512

[recipients]
ops = "alice|bob"
"#,
        )
        .expect("write");

        let cfg = AppConfig::load_from_path(&path).expect("load");
        assert_eq!(cfg.api.corp_id, "ww0123");
        assert_eq!(cfg.api.agent_id, 1_000_002);
        assert_eq!(cfg.api.max_content_bytes, 512);
        assert_eq!(cfg.api.duplicate_check_interval, 600);
        assert_eq!(cfg.resolve_alias("OPS"), Some("alice|bob"));
        assert_eq!(cfg.resolve_alias("dev"), None);
    }

    #[test]
    fn add_alias_preserves_other_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\ncorp_id = \"ww1\"\n").expect("write");

        AppConfig::add_alias(&path, "me", "zhangsan").expect("add alias");

        let cfg = AppConfig::load_from_path(&path).expect("load");
        assert_eq!(cfg.api.corp_id, "ww1");
        assert_eq!(cfg.resolve_alias("me"), Some("zhangsan"));
    }

    #[test]
    fn redacted_masks_secret() {
        let mut cfg = AppConfig::default();
        cfg.api.secret = "topsecret".to_string();
        let shown = cfg.redacted();
        assert_eq!(shown.api.secret, "********");
        assert_eq!(cfg.api.secret, "topsecret");
        assert!(AppConfig::default().redacted().api.secret.is_empty());
    }

    #[test]
    fn profile_override_applies() {
        let cfg = AppConfig::default().with_profile_override(Some("staging".to_string()));
        assert_eq!(cfg.profile, "staging");
    }
}
