use crate::traits::*;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::Notify;

/// Handlers keyed by route, owned by the connection task.
pub type RouteTable<R> = HashMap<
    <R as MessageRouter>::RouteKey,
    Box<dyn MessageHandler<<R as MessageRouter>::Message>>,
>;

/// Everything the client task needs, assembled by the builder.
///
/// The config is moved into the task: handlers need `&mut` access and the
/// task is their only user.
pub struct ClientConfig<R>
where
    R: MessageRouter,
{
    /// WebSocket URL (wss:// or ws://), including any query parameters
    pub(crate) url: String,

    /// Message router for parsing and routing messages
    pub(crate) router: R,

    /// Handlers per route key
    pub(crate) routes: RouteTable<R>,

    /// Optional passive ping detector
    pub(crate) passive_ping: Option<Box<dyn PassivePingDetector>>,

    /// Reconnection strategy with its attempt counter
    pub(crate) reconnect: ReconnectSchedule,

    /// Run flag: `false` stops the client and prevents reconnection
    pub(crate) shutdown_flag: Arc<AtomicBool>,

    /// Wakes the task out of sleeps and reads when shutdown is requested
    pub(crate) shutdown_notify: Arc<Notify>,
}

impl<R> ClientConfig<R>
where
    R: MessageRouter,
{
    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if passive ping detection is configured
    pub fn has_passive_ping(&self) -> bool {
        self.passive_ping.is_some()
    }

    /// Get the number of configured handlers
    pub fn handler_count(&self) -> usize {
        self.routes.len()
    }
}
