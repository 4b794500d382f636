use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::trace;

use crate::monitors::{status::DEFAULT_FRESHNESS_SECS, threshold::DEFAULT_THRESHOLD_CELSIUS};
use crate::util::{get_auth_token, get_bind_addr, get_db_path};

/// Storage backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./fever.db")
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Optional bearer token required on every request
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Enable permissive CORS for browser dashboards
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth_token: None,
            enable_cors: true,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsConfig {
    /// Value used for devices without a stored threshold
    #[serde(default = "default_threshold_celsius")]
    pub default_celsius: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            default_celsius: default_threshold_celsius(),
        }
    }
}

fn default_threshold_celsius() -> f64 {
    DEFAULT_THRESHOLD_CELSIUS
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// How old the latest reading may be and still count as live
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
        }
    }
}

fn default_freshness_secs() -> u64 {
    DEFAULT_FRESHNESS_SECS
}

/// Retention policy for the maintenance sweep
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Run the sweep on a timer inside the hub
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Readings older than this are deleted
    #[serde(default = "default_readings_days")]
    pub readings_days: u32,

    /// Alerts resolved longer ago than this are deleted
    #[serde(default = "default_resolved_alerts_days")]
    pub resolved_alerts_days: u32,

    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            readings_days: default_readings_days(),
            resolved_alerts_days: default_resolved_alerts_days(),
            interval_hours: default_interval_hours(),
        }
    }
}

fn default_readings_days() -> u32 {
    30
}

fn default_resolved_alerts_days() -> u32 {
    7
}

fn default_interval_hours() -> u32 {
    24
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Config {
    /// Let `FEVER_*` environment variables win over the file
    pub fn apply_env_overrides(&mut self) {
        if let Some(addr) = get_bind_addr() {
            trace!("bind address overridden from environment: {addr}");
            self.api.bind_addr = addr;
        }

        if let Some(token) = get_auth_token() {
            self.api.auth_token = Some(token);
        }

        if let Some(path) = get_db_path() {
            trace!("database path overridden from environment: {}", path.display());
            self.storage = StorageConfig::Sqlite { path };
        }
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
