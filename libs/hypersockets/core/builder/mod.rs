pub mod states;

use crate::client::WebSocketClient;
use crate::config::{ClientConfig, RouteTable};
use crate::traits::*;
use states::*;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Default reconnection delays: 1s doubling up to 30s, forever
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Type-state builder for WebSocketClient
///
/// The URL and the router must both be set before `build()` is available.
pub struct WebSocketClientBuilder<U, Ro>
where
    U: UrlState,
    Ro: RouterState,
{
    url: U,
    router: Ro,
    passive_ping: Option<Box<dyn PassivePingDetector>>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl WebSocketClientBuilder<NoUrl, NoRouter> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            url: NoUrl,
            router: NoRouter,
            passive_ping: None,
            reconnect_strategy: None,
            shutdown_flag: None,
        }
    }
}

impl Default for WebSocketClientBuilder<NoUrl, NoRouter> {
    fn default() -> Self {
        Self::new()
    }
}

// URL setting
impl<Ro> WebSocketClientBuilder<NoUrl, Ro>
where
    Ro: RouterState,
{
    pub fn url(self, url: impl Into<String>) -> WebSocketClientBuilder<HasUrl, Ro> {
        WebSocketClientBuilder {
            url: HasUrl(url.into()),
            router: self.router,
            passive_ping: self.passive_ping,
            reconnect_strategy: self.reconnect_strategy,
            shutdown_flag: self.shutdown_flag,
        }
    }
}

/// Routing builder helper
///
/// Collects one handler per route key.
pub struct RoutingBuilder<R>
where
    R: MessageRouter,
{
    handlers: RouteTable<R>,
}

impl<R> RoutingBuilder<R>
where
    R: MessageRouter,
{
    fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Add a handler for a specific route key
    pub fn handler<H>(mut self, route_key: R::RouteKey, handler: H) -> Self
    where
        H: MessageHandler<R::Message>,
    {
        self.handlers.insert(route_key, Box::new(handler));
        self
    }

    fn build(self) -> RouteTable<R> {
        self.handlers
    }
}

// Router setting
impl<U> WebSocketClientBuilder<U, NoRouter>
where
    U: UrlState,
{
    pub fn router<R, F>(self, router: R, configure_routing: F) -> WebSocketClientBuilder<U, HasRouter<R>>
    where
        R: MessageRouter,
        F: FnOnce(RoutingBuilder<R>) -> RoutingBuilder<R>,
    {
        let routing = configure_routing(RoutingBuilder::new());

        WebSocketClientBuilder {
            url: self.url,
            router: HasRouter { router, routing },
            passive_ping: self.passive_ping,
            reconnect_strategy: self.reconnect_strategy,
            shutdown_flag: self.shutdown_flag,
        }
    }
}

// Optional configuration methods
impl<U, Ro> WebSocketClientBuilder<U, Ro>
where
    U: UrlState,
    Ro: RouterState,
{
    pub fn passive_ping(mut self, detector: impl PassivePingDetector + 'static) -> Self {
        self.passive_ping = Some(Box::new(detector));
        self
    }

    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Share a run flag with other components.
    ///
    /// Storing `false` stops the client: it closes the socket at the next
    /// frame boundary and never reconnects.
    ///
    /// ```ignore
    /// let running = Arc::new(AtomicBool::new(true));
    /// let client = hypersockets::builder()
    ///     .url("wss://api.example.com")
    ///     .router(MyRouter, |routing| routing.handler(Route::Live, MyHandler))
    ///     .shutdown_flag(Arc::clone(&running))
    ///     .build()
    ///     .await?;
    ///
    /// running.store(false, Ordering::Release);
    /// ```
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }
}

// Build method - only available when all required fields are set
impl<R> WebSocketClientBuilder<HasUrl, HasRouter<R>>
where
    R: MessageRouter,
{
    /// Spawn the client task. Must be called inside a tokio runtime.
    pub async fn build(self) -> Result<WebSocketClient> {
        let HasUrl(url) = self.url;
        if url.is_empty() {
            return Err(HyperSocketError::Configuration("empty URL".into()));
        }

        let HasRouter { router, routing } = self.router;

        let strategy = self.reconnect_strategy.unwrap_or_else(|| {
            Box::new(ExponentialBackoff::unlimited(
                DEFAULT_BACKOFF_BASE,
                DEFAULT_BACKOFF_CAP,
            ))
        });

        let config = ClientConfig {
            url,
            router,
            routes: routing.build(),
            passive_ping: self.passive_ping,
            reconnect: ReconnectSchedule::new(strategy),
            shutdown_flag: self
                .shutdown_flag
                .unwrap_or_else(|| Arc::new(AtomicBool::new(true))),
            shutdown_notify: Arc::new(Notify::new()),
        };

        Ok(WebSocketClient::spawn(config))
    }
}
