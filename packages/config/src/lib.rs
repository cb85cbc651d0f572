#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Typed configuration.
//!
//! [`AppConfig::load`] reads an optional TOML file named by
//! `ALERTA_CONFIG`, then applies environment overrides. The result is
//! built once at startup and passed to whatever needs it.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "ALERTA_CONFIG";

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AppConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue {
        /// Environment variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

/// Which report store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    /// `SQLite` file at [`StorageConfig::database_path`].
    #[default]
    Sqlite,
    /// Process memory; lost on restart.
    Memory,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub sweep: SweepConfig,
    pub notifications: NotificationConfig,
}

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Report and image persistence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_path: PathBuf,
    pub blob_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: PathBuf::from("data/alerta.db"),
            blob_dir: PathBuf::from("data/blobs"),
        }
    }
}

/// Classification sweep schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between passes in watch mode.
    pub interval_secs: u64,
    /// Maximum reports per pass; unlimited when absent.
    pub batch_limit: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            batch_limit: None,
        }
    }
}

/// Notification fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Events a slow subscriber may lag behind before losing the oldest.
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

impl AppConfig {
    /// Loads the file named by `ALERTA_CONFIG` (if set) and applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override has an invalid value.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Parses TOML. Missing sections and keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Applies overrides from `lookup` (normally the process environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric override does not
    /// parse.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(port) = parse_override(&lookup, "PORT")? {
            self.server.port = port;
        }
        if let Some(backend) = parse_override(&lookup, "ALERTA_STORAGE_BACKEND")? {
            self.storage.backend = backend;
        }
        if let Some(path) = lookup("ALERTA_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("ALERTA_BLOB_DIR") {
            self.storage.blob_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_override(&lookup, "ALERTA_SWEEP_INTERVAL_SECS")? {
            self.sweep.interval_secs = secs;
        }
        Ok(())
    }
}

fn parse_override<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.database_path, PathBuf::from("data/alerta.db"));
        assert_eq!(config.sweep.interval_secs, 300);
        assert_eq!(config.notifications.channel_capacity, 256);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9090

            [storage]
            backend = "memory"

            [sweep]
            batch_limit = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.blob_dir, PathBuf::from("data/blobs"));
        assert_eq!(config.sweep.batch_limit, Some(50));
        assert_eq!(config.sweep.interval_secs, 300);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_toml_str("[server]\nport = \"eighty\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: BTreeMap<&str, &str> = [
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "3000"),
            ("ALERTA_DATABASE_PATH", "/tmp/a.db"),
            ("ALERTA_SWEEP_INTERVAL_SECS", "60"),
            ("ALERTA_STORAGE_BACKEND", "Memory"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.database_path, PathBuf::from("/tmp/a.db"));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.sweep.interval_secs, 60);
    }

    #[test]
    fn bad_numeric_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|key| (key == "PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "PORT"));
    }
}
