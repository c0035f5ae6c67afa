//! Message Routing System
//!
//! ```text
//! WebSocket → PassivePing? → Router::parse → Route Key → Handler
//! ```
//!
//! # Ordering Guarantees
//!
//! Frames are parsed and dispatched inline by the connection task, one at a
//! time, so every handler observes messages in exactly the order they arrived
//! on the socket. Handlers must therefore stay cheap: they run between two
//! socket reads.

use crate::{Result, WsMessage};
use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;

/// Parses raw frames into typed messages and picks the handler for each.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// enum Route { Live }
///
/// struct MyRouter;
///
/// #[async_trait]
/// impl MessageRouter for MyRouter {
///     type Message = MyMessage;
///     type RouteKey = Route;
///
///     async fn parse(&self, message: WsMessage) -> Result<Self::Message> {
///         // decode JSON
///     }
///
///     fn route_key(&self, _message: &Self::Message) -> Self::RouteKey {
///         Route::Live
///     }
/// }
/// ```
#[async_trait]
pub trait MessageRouter: Send + Sync + 'static {
    /// The parsed message type
    type Message: Send + Debug + 'static;

    /// The route key type (determines which handler processes the message)
    type RouteKey: Hash + Eq + Clone + Send + Sync + Debug + 'static;

    /// Parse a raw WebSocket message into a typed message
    ///
    /// Errors are logged by the client and the frame is dropped; the
    /// connection stays up.
    async fn parse(&self, message: WsMessage) -> Result<Self::Message>;

    /// Extract the route key from a parsed message
    fn route_key(&self, message: &Self::Message) -> Self::RouteKey;
}

/// Processes typed messages for one route key.
///
/// Runs on the connection task, inside the tokio runtime, so handlers may
/// spawn tasks but must not block.
pub trait MessageHandler<M>: Send + 'static
where
    M: Send + Debug + 'static,
{
    /// Handle a parsed message
    ///
    /// # Errors
    /// Errors are logged; the next message is still delivered.
    fn handle(&mut self, message: M) -> Result<()>;
}
