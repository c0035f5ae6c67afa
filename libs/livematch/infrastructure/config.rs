use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::application::PollSettings;
use crate::domain::ClientRole;

/// Environment variable overriding `ws_url`
pub const WS_URL_ENV: &str = "LIVEMATCH_WS_URL";
/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "LIVEMATCH_API_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Live match feed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Channel endpoint, without the `type`/`match_id` query
    #[serde(default)]
    pub ws_url: String,
    /// Base URL of the reference-data REST API
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub role: ClientRole,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_point_flash_ms")]
    pub point_flash_ms: u64,
    #[serde(default = "default_banner_ms")]
    pub banner_ms: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            point_flash_ms: default_point_flash_ms(),
            banner_ms: default_banner_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_rankings_interval_secs")]
    pub rankings_interval_secs: u64,
    #[serde(default = "default_limit")]
    pub rankings_limit: u32,
    #[serde(default = "default_limit")]
    pub recent_results_limit: u32,
    #[serde(default = "default_sponsors_interval_secs")]
    pub sponsors_interval_secs: u64,
    /// Rotation interval for sponsor slots that do not set their own
    #[serde(default = "default_rotation_secs")]
    pub rotation_default_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            rankings_interval_secs: default_rankings_interval_secs(),
            rankings_limit: default_limit(),
            recent_results_limit: default_limit(),
            sponsors_interval_secs: default_sponsors_interval_secs(),
            rotation_default_secs: default_rotation_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_point_flash_ms() -> u64 {
    1_500
}

fn default_banner_ms() -> u64 {
    3_000
}

fn default_rankings_interval_secs() -> u64 {
    60
}

fn default_limit() -> u32 {
    10
}

fn default_sponsors_interval_secs() -> u64 {
    300
}

fn default_rotation_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl FeedConfig {
    /// Config with every tunable at its default
    pub fn new(ws_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            api_url: api_url.into(),
            role: ClientRole::default(),
            reconnect: ReconnectConfig::default(),
            overlay: OverlayConfig::default(),
            polling: PollingConfig::default(),
            log_level: default_log_level(),
        }
    }

    /// Load configuration from YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        Self::from_yaml(&yaml_content)
    }

    /// Parse YAML, apply environment overrides and validate
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: FeedConfig = serde_yaml::from_str(yaml)?;

        if let Ok(ws_url) = std::env::var(WS_URL_ENV) {
            info!("Overriding ws_url from {}", WS_URL_ENV);
            config.ws_url = ws_url;
        }
        if let Ok(api_url) = std::env::var(API_URL_ENV) {
            info!("Overriding api_url from {}", API_URL_ENV);
            config.api_url = api_url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.ws_url.is_empty() {
            return Err(ConfigError::EnvVarMissing(format!(
                "ws_url is not set (YAML or {})",
                WS_URL_ENV
            )));
        }
        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err(ConfigError::ValidationError(
                "ws_url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.api_url.is_empty() {
            return Err(ConfigError::EnvVarMissing(format!(
                "api_url is not set (YAML or {})",
                API_URL_ENV
            )));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(
                "api_url must start with http:// or https://".to_string(),
            ));
        }

        if self.reconnect.base_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect.base_delay_ms must be greater than 0".to_string(),
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            return Err(ConfigError::ValidationError(
                "reconnect.max_delay_ms must be >= reconnect.base_delay_ms".to_string(),
            ));
        }

        if self.overlay.point_flash_ms == 0 || self.overlay.banner_ms == 0 {
            return Err(ConfigError::ValidationError(
                "overlay lifetimes must be greater than 0".to_string(),
            ));
        }

        let polling = &self.polling;
        if polling.rankings_interval_secs == 0
            || polling.sponsors_interval_secs == 0
            || polling.rotation_default_secs == 0
            || polling.request_timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "polling intervals and timeouts must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect.max_delay_ms)
    }

    pub fn point_flash_lifetime(&self) -> Duration {
        Duration::from_millis(self.overlay.point_flash_ms)
    }

    pub fn banner_lifetime(&self) -> Duration {
        Duration::from_millis(self.overlay.banner_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.polling.request_timeout_secs)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            rankings_interval: Duration::from_secs(self.polling.rankings_interval_secs),
            rankings_limit: self.polling.rankings_limit,
            recent_results_limit: self.polling.recent_results_limit,
            sponsors_interval: Duration::from_secs(self.polling.sponsors_interval_secs),
            default_rotation: Duration::from_secs(self.polling.rotation_default_secs),
        }
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Feed URL: {}", self.ws_url);
        info!("  API URL: {}", self.api_url);
        info!("  Role: {}", self.role.as_str());
        info!(
            "  Reconnect backoff: {}ms base, {}ms cap",
            self.reconnect.base_delay_ms, self.reconnect.max_delay_ms
        );
        info!(
            "  Overlays: flash {}ms, banner {}ms",
            self.overlay.point_flash_ms, self.overlay.banner_ms
        );
        info!(
            "  Polls: rankings {}s (top {}), sponsors {}s, rotation {}s",
            self.polling.rankings_interval_secs,
            self.polling.rankings_limit,
            self.polling.sponsors_interval_secs,
            self.polling.rotation_default_secs
        );
        info!("  Log level: {}", self.log_level);
    }
}
