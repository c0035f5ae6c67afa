//! # HyperSockets Traits
//!
//! Core traits and types shared by the client:
//!
//! - **MessageRouter / MessageHandler**: decode frames and apply them in order
//! - **ReconnectionStrategy**: control reconnection delays
//! - **PassivePingDetector**: answer application-level keepalive probes

pub mod error;
pub mod parser;
pub mod passive_ping;
pub mod reconnect;
pub mod router;

// Re-export commonly used types
pub use error::{HyperSocketError, Result};
pub use parser::WsMessage;
pub use passive_ping::{JsonPassivePing, PassivePingDetector, TextPassivePing};
pub use reconnect::{
    ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectSchedule, ReconnectionStrategy,
};
pub use router::{MessageHandler, MessageRouter};
