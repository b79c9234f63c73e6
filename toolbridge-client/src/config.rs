//! Client configuration loading
//!
//! Reads the bridge settings from `$XDG_CONFIG_HOME/toolbridge/config.toml`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use toolbridge_utils::{config_file, BridgeError, Result};

/// Default page origin the bridge endpoint is derived from
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";

/// Bridge client configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Origin of the console page (`http://host:port` or `https://host`)
    pub origin: String,
    /// Capacity of the outgoing frame queue
    pub outgoing_buffer: usize,
    /// Reconnect behavior after the connection drops
    pub reconnect: ReconnectConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.into(),
            outgoing_buffer: 100,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Check values that would make the client misbehave
    pub fn validate(&self) -> Result<()> {
        if self.origin.trim().is_empty() {
            return Err(BridgeError::config("origin must not be empty"));
        }
        if self.outgoing_buffer == 0 {
            return Err(BridgeError::config("outgoing_buffer must be at least 1"));
        }
        if self.reconnect.initial_delay_ms == 0 {
            return Err(BridgeError::config(
                "reconnect.initial_delay_ms must be at least 1",
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return Err(BridgeError::config(
                "reconnect.max_delay_ms must not be below reconnect.initial_delay_ms",
            ));
        }
        Ok(())
    }
}

/// Reconnect policy (disabled by default: a closed bridge stays closed)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Reconnect automatically after the connection drops
    pub enabled: bool,
    /// Delay before the first attempt
    pub initial_delay_ms: u64,
    /// Upper bound for the exponential backoff
    pub max_delay_ms: u64,
    /// Give up after this many failed attempts (unlimited when unset)
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Backoff delay before the given (zero-based) attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Whether another attempt is allowed after `attempts` failures
    pub fn allows_attempt(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// Load and validate configuration from a specific file
pub fn load_config_from(path: &Path) -> Result<BridgeConfig> {
    if !path.exists() {
        return Err(BridgeError::ConfigNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| BridgeError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: BridgeConfig = toml::from_str(&content).map_err(|e| BridgeError::ConfigInvalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    config.validate().map_err(|e| BridgeError::ConfigInvalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(config)
}

/// Load configuration from the default config file
///
/// Returns defaults if the file doesn't exist or can't be parsed.
pub fn load_config() -> BridgeConfig {
    let path = config_file();

    if !path.exists() {
        tracing::debug!("Config file not found, using defaults");
        return BridgeConfig::default();
    }

    match load_config_from(&path) {
        Ok(config) => {
            tracing::debug!(origin = %config.origin, "Loaded bridge config from {}", path.display());
            config
        }
        Err(e) => {
            tracing::warn!("{}, using defaults", e);
            BridgeConfig::default()
        }
    }
}
