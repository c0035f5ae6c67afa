//! Scoreboard TV - Main Library
//!
//! Thin presentation layer over the live match feed client.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **livematch**: Feed session, reducer, overlays and pollers (re-exported from workspace)
//! - **hypersockets**: WebSocket library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,no_run
//! use scoreboard_tv::bin_common::{load_config_from_env, ConfigType};
//! use scoreboard_tv::livematch::FeedConfig;
//!
//! let config = FeedConfig::load(load_config_from_env(ConfigType::Feed));
//! ```

// Re-export workspace libraries for convenience
pub use hypersockets;
pub use livematch;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType, FeedArgs};
    pub use runner::{BinaryRunner, RunConfig};
}
