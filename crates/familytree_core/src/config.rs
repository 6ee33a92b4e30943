//! Environment-driven host configuration.
//!
//! # Responsibility
//! - Resolve source document, store path and logging settings.
//! - Keep defaults in one place for the CLI and FFI hosts.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Log level is validated here so hosts fail before opening the store.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_SOURCE_PATH: &str = "FAMILYTREE_SOURCE_PATH";
pub const ENV_DB_PATH: &str = "FAMILYTREE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "FAMILYTREE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "FAMILYTREE_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "familytree.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(message) => write!(f, "{ENV_LOG_LEVEL}: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved host configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Source document. `None` means the bundled sample tree.
    pub source_path: Option<PathBuf>,
    /// SQLite snapshot store.
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// Log directory. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let log_level = match value(ENV_LOG_LEVEL) {
            Some(raw) => normalize_level(&raw).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        Ok(Self {
            source_path: value(ENV_SOURCE_PATH).map(PathBuf::from),
            db_path: value(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level,
            log_dir: value(ENV_LOG_DIR).map(PathBuf::from),
        })
    }

    /// Reads the source document, falling back to the bundled sample.
    pub fn read_source(&self) -> std::io::Result<String> {
        match &self.source_path {
            Some(path) => std::fs::read_to_string(path),
            None => Ok(crate::SAMPLE_DOCUMENT.to_string()),
        }
    }
}
