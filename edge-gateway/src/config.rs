//! Configuration for the edge gateway.

use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub services: ServicesConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Identity of this gateway, used to address sensor commands.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub name: String,
}

/// Base URLs of the services the gateway talks to.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    /// Local inference service.
    pub inference_url: String,
    /// Metadata service holding the device registry.
    pub metadata_url: String,
    /// Sensor-control service (MQTT bridge).
    pub sensor_url: String,
    /// Device command channel (EdgeX core-command style API).
    pub command_url: String,
    /// Cloud backend.
    pub cloud_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ServicesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Inference routing policy.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Apply heuristic feedback from gateway predictions.
    #[serde(default = "default_true")]
    pub adaptive: bool,
    /// Emit latency telemetry for gateway predictions.
    #[serde(default)]
    pub latency_benchmark: bool,
    #[serde(default = "default_polling_interval")]
    pub polling_interval_ms: u64,
    /// Upper bound on waiting for a prediction task. 0 disables the bound.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            adaptive: default_true(),
            latency_benchmark: false,
            polling_interval_ms: default_polling_interval(),
            poll_timeout_ms: default_poll_timeout(),
        }
    }
}

impl InferenceConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        match self.poll_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Command queue storage.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite database path (sqlite backend only).
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_request_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_polling_interval() -> u64 {
    100
}
fn default_poll_timeout() -> u64 {
    30_000
}
fn default_store_path() -> String {
    "./data/commands.db".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (EDGE__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("inference.polling_interval_ms", default_polling_interval() as i64)?
            .set_default("inference.poll_timeout_ms", default_poll_timeout() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("EDGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
