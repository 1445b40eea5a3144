//! Explicit, immutable configuration for the provider and logging.
//!
//! # Responsibility
//! - Describe every tunable the provider reads at construction time.
//! - Load settings from JSON and validate identity strings.
//!
//! # Invariants
//! - Configuration is passed in; nothing here is process-global.
//! - Identity strings accept hyphenated, simple, braced, or URN UUID text.

use crate::logging::default_log_level;
use crate::model::item::ItemId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default structural cache budget.
pub const DEFAULT_CACHE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_LOG_FILE_BASENAME: &str = "fieldstore";

/// Errors from configuration loading and validation.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// A configured identity is not a valid UUID.
    InvalidIdentity { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read configuration: {err}"),
            Self::Parse(err) => write!(f, "cannot parse configuration: {err}"),
            Self::InvalidIdentity { key, value } => {
                write!(f, "`{key}` is not a valid identity: `{value}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::InvalidIdentity { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// External item this store's top-level items are mounted under.
    pub join_parent_id: String,
    /// Byte budget of the structural cache. Zero disables caching.
    pub cache_size_bytes: u64,
    /// Evict an item's cached structure after `save_item`/`add_version`.
    pub invalidate_on_write: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            join_parent_id: Uuid::nil().to_string(),
            cache_size_bytes: DEFAULT_CACHE_SIZE_BYTES,
            invalidate_on_write: false,
        }
    }
}

impl ProviderConfig {
    pub fn with_join_parent(join_parent_id: impl Into<String>) -> Self {
        Self {
            join_parent_id: join_parent_id.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json(path.as_ref())
    }

    /// Parses the configured join-parent identity.
    pub fn join_parent(&self) -> Result<ItemId, ConfigError> {
        parse_identity("join_parent_id", &self.join_parent_id)
    }
}

/// Logging settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
    pub file_basename: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join(DEFAULT_LOG_FILE_BASENAME),
            file_basename: DEFAULT_LOG_FILE_BASENAME.to_string(),
        }
    }
}

impl LogSettings {
    pub fn new(level: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
            ..Self::default()
        }
    }
}

/// Settings for a complete process: database location, provider, logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub logging: Option<LogSettings>,
}

impl AppConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json(path.as_ref())
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn parse_identity(key: &'static str, value: &str) -> Result<ItemId, ConfigError> {
    Uuid::parse_str(value.trim()).map_err(|_| ConfigError::InvalidIdentity {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ProviderConfig, DEFAULT_CACHE_SIZE_BYTES};
    use uuid::Uuid;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config = ProviderConfig::from_json_str(r#"{"invalidate_on_write": true}"#)
            .expect("partial config should parse");
        assert_eq!(config.cache_size_bytes, DEFAULT_CACHE_SIZE_BYTES);
        assert!(config.invalidate_on_write);
        assert_eq!(config.join_parent().expect("nil parses"), Uuid::nil());
    }

    #[test]
    fn join_parent_accepts_braced_identity() {
        let config = ProviderConfig::with_join_parent("{0DE95AE4-41AB-4D01-9EB0-67441B7C2450}");
        assert_eq!(
            config.join_parent().expect("braced id should parse").to_string(),
            "0de95ae4-41ab-4d01-9eb0-67441b7c2450"
        );
    }

    #[test]
    fn malformed_join_parent_is_rejected() {
        let config = ProviderConfig::with_join_parent("not-an-id");
        let err = config.join_parent().expect_err("malformed id must fail");
        assert!(matches!(err, ConfigError::InvalidIdentity { key: "join_parent_id", .. }));
    }
}
