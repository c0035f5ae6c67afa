//! Client core: builder, connection task and shared state.
//!
//! ```rust,ignore
//! let client = hypersockets::builder()
//!     .url("wss://api.example.com/ws?type=tv")
//!     .router(MyRouter, |routing| routing.handler(Route::Live, MyHandler::new()))
//!     .passive_ping(JsonPassivePing::new("type", "ping", WsMessage::text(r#"{"type":"pong"}"#)))
//!     .reconnect_strategy(ExponentialBackoff::unlimited(
//!         Duration::from_secs(1),
//!         Duration::from_secs(30),
//!     ))
//!     .build()
//!     .await?;
//!
//! while let Some(event) = client.try_recv_event() {
//!     tracing::info!("Event: {:?}", event);
//! }
//!
//! client.shutdown().await?;
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;

// Re-export main types
pub use builder::{states, RoutingBuilder, WebSocketClientBuilder};
pub use client::{ClientEvent, Metrics, WebSocketClient};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new WebSocket client builder
pub fn builder() -> WebSocketClientBuilder<builder::states::NoUrl, builder::states::NoRouter> {
    WebSocketClientBuilder::new()
}
