//! WebSocket client for the live match feed
//!
//! Frames are decoded by [`FeedRouter`] and folded into the shared
//! [`LiveState`] by [`FeedHandler`], inline and in arrival order. Server
//! keepalives (`{"type":"ping"}`) are answered by the transport before they
//! reach the router.

use chrono::Utc;
use hypersockets::{
    ClientEvent, ExponentialBackoff, HyperSocketError, JsonPassivePing, MessageHandler,
    MessageRouter, WebSocketClient, WebSocketClientBuilder, WsMessage,
};
use parking_lot::Mutex;
use reqwest::Url;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::application::{reduce, LiveState, OverlayTimer, Reduction};
use crate::domain::{decode, ClientRole, FeedMessage};

/// Keepalive reply expected by the server
pub const PONG_MESSAGE: &str = r#"{"type":"pong"}"#;

/// Single route: every feed message goes to the reducer
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum FeedRoute {
    Live,
}

/// Build the channel URL: `{base}?type=<role>[&match_id=<scope>]`
pub fn feed_url(base: &str, role: ClientRole, scope: Option<&str>) -> Result<String, String> {
    let mut url = Url::parse(base).map_err(|e| format!("invalid feed url {}: {}", base, e))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("type", role.as_str());
        if let Some(match_id) = scope {
            query.append_pair("match_id", match_id);
        }
    }
    Ok(url.to_string())
}

// =============================================================================
// Router - Decodes feed frames
// =============================================================================

pub struct FeedRouter;

impl FeedRouter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FeedRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MessageRouter for FeedRouter {
    type Message = FeedMessage;
    type RouteKey = FeedRoute;

    async fn parse(&self, message: WsMessage) -> hypersockets::Result<Self::Message> {
        let text = message
            .as_text()
            .ok_or_else(|| HyperSocketError::ParseError("binary frame on feed channel".to_string()))?;

        decode(text).map_err(|e| {
            debug!("[Feed] Failed to decode message: {} - {}", e, text);
            HyperSocketError::ParseError(e.to_string())
        })
    }

    fn route_key(&self, _message: &Self::Message) -> Self::RouteKey {
        FeedRoute::Live
    }
}

// =============================================================================
// Handler - Applies messages to live state
// =============================================================================

/// Runs the reducer against the shared state and forwards signals to the
/// overlay timer.
pub struct FeedHandler {
    live: Arc<Mutex<LiveState>>,
    overlay: OverlayTimer,
    message_count: u64,
}

impl FeedHandler {
    pub fn new(live: Arc<Mutex<LiveState>>, overlay: OverlayTimer) -> Self {
        Self {
            live,
            overlay,
            message_count: 0,
        }
    }
}

impl MessageHandler<FeedMessage> for FeedHandler {
    fn handle(&mut self, message: FeedMessage) -> hypersockets::Result<()> {
        self.message_count += 1;
        let kind = message.kind();

        let signals = {
            let mut live = self.live.lock();
            let Reduction { mut state, signals } = reduce(std::mem::take(&mut *live), message);
            state.last_update = Some(Utc::now());
            *live = state;
            signals
        };

        debug!(
            "[Feed] #{} {} -> {} signal(s)",
            self.message_count,
            kind,
            signals.len()
        );
        for signal in signals {
            self.overlay.show(signal);
        }
        Ok(())
    }
}

// =============================================================================
// WebSocket Client Builder
// =============================================================================

/// Build the feed client.
///
/// Each client gets its own run flag because hypersockets clears it during
/// `client.shutdown()`.
pub async fn build_feed_client(
    url: &str,
    handler: FeedHandler,
    base_delay: Duration,
    max_delay: Duration,
) -> hypersockets::Result<WebSocketClient> {
    let local_shutdown_flag = Arc::new(AtomicBool::new(true));

    info!("[Feed] Connecting to {}", url);
    WebSocketClientBuilder::new()
        .url(url)
        .router(FeedRouter::new(), move |routing| {
            routing.handler(FeedRoute::Live, handler)
        })
        .passive_ping(JsonPassivePing::new(
            "type",
            "ping",
            WsMessage::text(PONG_MESSAGE),
        ))
        .reconnect_strategy(ExponentialBackoff::unlimited(base_delay, max_delay))
        .shutdown_flag(local_shutdown_flag)
        .build()
        .await
}

/// Log a client event. Returns `true` while the channel is usable.
pub fn handle_client_event(event: &ClientEvent) -> bool {
    match event {
        ClientEvent::Connected => {
            info!("[Feed] WebSocket connected");
            true
        }
        ClientEvent::Disconnected => {
            warn!("[Feed] WebSocket disconnected");
            false
        }
        ClientEvent::Reconnecting(attempt) => {
            warn!("[Feed] Reconnecting (attempt {})", attempt);
            false
        }
        ClientEvent::Error(err) => {
            warn!("[Feed] Error: {}", err);
            false
        }
    }
}
