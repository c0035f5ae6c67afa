//! Infrastructure Layer
//!
//! Network clients, configuration, logging and process shutdown.

pub mod client;
pub mod config;
pub mod logging;
pub mod shutdown;

pub use client::{
    build_feed_client, feed_url, handle_client_event, FeedHandler, FeedRouter, ReferenceApiError,
    ReferenceSource, RestReferenceClient,
};
pub use config::{ConfigError, FeedConfig};
pub use logging::init_tracing;
pub use shutdown::ShutdownManager;
