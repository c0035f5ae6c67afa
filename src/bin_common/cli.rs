//! CLI utilities for binaries
//!
//! Handles configuration loading and environment variables
//! for all binary executables.

use livematch::ClientRole;
use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Feed configuration (feed_config.yaml)
    Feed,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Feed => "config/feed_config.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Feed => "FEED_CONFIG_PATH",
            ConfigType::Custom(_) => "CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use scoreboard_tv::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Feed);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Options accepted by the display binaries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedArgs {
    /// `--match <id>` limits the channel to one match
    pub scope: Option<String>,
    /// `--control` connects as a control client instead of a TV
    pub role: Option<ClientRole>,
}

impl FeedArgs {
    pub fn parse(args: &[String]) -> Self {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--match" | "-m" => parsed.scope = iter.next().cloned(),
                "--control" => parsed.role = Some(ClientRole::Control),
                "--tv" => parsed.role = Some(ClientRole::Tv),
                _ => {}
            }
        }
        parsed
    }
}
