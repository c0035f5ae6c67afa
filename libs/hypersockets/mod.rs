//! # HyperSockets
//!
//! A small reconnecting WebSocket client.
//!
//! ## Features
//!
//! - **Ordered dispatch**: frames are parsed and handed to their handler in
//!   arrival order
//! - **Type-state builder**: URL and router are checked at compile time
//! - **Unlimited reconnection** with pluggable backoff, reset on every open
//! - **Passive ping**: application-level keepalives answered inline
//! - **Prompt teardown**: shutdown cancels pending reconnects immediately

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder,
    builder::{states, RoutingBuilder, WebSocketClientBuilder},
    client,
    client::{ClientEvent, Metrics, WebSocketClient},
    config,
    config::ClientConfig,
    connection_state,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
};

// Convenience function
pub use self::core::builder as client_builder;
