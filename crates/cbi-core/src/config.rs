use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::request::Config;
use crate::retry::{RetryingTransport, TimeUnit};
use crate::transport::Transport;

/// Timeouts applied to every request (section `[transport]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Bound on establishing the connection, in milliseconds (0 = curl default).
    pub connect_timeout_millis: u64,
    /// Wall-clock bound on a whole attempt, in milliseconds (0 = unbounded).
    pub timeout_millis: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout_millis: 20_000,
            timeout_millis: 0,
        }
    }
}

/// Retry parameters (section `[retry]`). Signed so that negative values reach the
/// retry builder and are rejected there with a clear message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: i64,
    pub retry_interval: i64,
    pub retry_interval_unit: TimeUnit,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_interval: 0,
            retry_interval_unit: TimeUnit::Seconds,
        }
    }
}

/// Global configuration loaded from `~/.config/cbi/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CbiConfig {
    /// Default processing service URL.
    #[serde(default)]
    pub server_url: Option<String>,
    /// Where error responses are saved (None = system temp dir).
    #[serde(default)]
    pub error_log_dir: Option<PathBuf>,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl CbiConfig {
    /// Per-call settings derived from `[transport]`.
    pub fn request_config(&self) -> Config {
        Config::default()
            .connect_timeout_millis(self.transport.connect_timeout_millis)
            .timeout_millis(self.transport.timeout_millis)
    }

    /// Wrap `delegate` with the configured retry policy.
    pub fn retrying<T: Transport>(&self, delegate: T) -> Result<RetryingTransport<T>> {
        let transport = RetryingTransport::retry_request_on(delegate)
            .max_retries(self.retry.max_retries)
            .wait_before_retry(self.retry.retry_interval, self.retry.retry_interval_unit)
            .build()
            .context("invalid [retry] configuration")?;
        Ok(transport)
    }

    pub fn error_log_dir(&self) -> PathBuf {
        self.error_log_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cbi")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CbiConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CbiConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CbiConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
