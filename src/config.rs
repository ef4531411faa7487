//! Layered configuration for the live-reload server.
//!
//! Sources, lowest precedence first:
//! - Default values
//! - TOML configuration file (`livewatch.toml` or `--config <path>`)
//! - Environment variables
//! - CLI argument overrides (applied by the `serve` command)
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `LIVEWATCH_` and use double
//! underscores to separate nested levels:
//! - `LIVEWATCH_SERVER__BIND=0.0.0.0:9000` sets `server.bind`
//! - `LIVEWATCH_WATCH__RECURSIVE=false` sets `watch.recursive`
//! - `LIVEWATCH_WATCH__DEBOUNCE_MS=250` sets `watch.debounce_ms`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::server::Compression;
use crate::watcher::WatchConfig;

/// Default settings file, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "livewatch.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "LIVEWATCH_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Configuration file already exists: {}. Use --force to overwrite", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory served at `/` and watched for changes.
    ///
    /// When unset no static files are served and the watcher observes the
    /// current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// File watching settings
    #[serde(default)]
    pub watch: WatchSettings,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Response compression for static files
    #[serde(default)]
    pub compression: Compression,

    /// PEM certificate chain; TLS is enabled when both cert and key are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_key: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchSettings {
    /// Regular expression matched against changed file base names.
    /// The watcher and the event endpoint are disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Watch subdirectories, including ones created after startup
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Window for suppressing duplicate (path, operation) events
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Interval between WebSocket keepalive pings
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level applied to every module without an override
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module levels, e.g. `livewatch::watcher = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

// Default value functions
fn default_version() -> u32 { 1 }
fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_true() -> bool { true }
fn default_debounce_ms() -> u64 { 100 }
fn default_ping_interval_secs() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            root: None,
            server: ServerConfig::default(),
            watch: WatchSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            compression: Compression::default(),
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            pattern: None,
            recursive: true,
            debounce_ms: default_debounce_ms(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources using `livewatch.toml` in the
    /// current directory. A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file layered over defaults, then
    /// environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels; single underscores
            // stay inside field names.
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write a default settings file. Refuses to overwrite unless `force`.
    pub fn init_config_file(path: impl AsRef<Path>, force: bool) -> Result<PathBuf, ConfigError> {
        let path = path.as_ref();
        if !force && path.exists() {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        Settings::default().save(path)?;
        Ok(path.to_path_buf())
    }

    /// TLS is used only when both halves of the key pair are configured.
    pub fn has_tls(&self) -> bool {
        self.server.tls_cert.is_some() && self.server.tls_key.is_some()
    }

    /// Directory the watcher observes.
    pub fn watch_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Watcher configuration, or `None` when no pattern is configured.
    pub fn watch_config(&self) -> Option<WatchConfig> {
        let pattern = self.watch.pattern.as_ref().filter(|p| !p.is_empty())?;
        Some(WatchConfig {
            root: self.watch_root(),
            pattern: pattern.clone(),
            recursive: self.watch.recursive,
            debounce: Duration::from_millis(self.watch.debounce_ms),
        })
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.watch.ping_interval_secs.max(1))
    }
}
