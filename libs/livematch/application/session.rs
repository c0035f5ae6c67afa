//! Feed session: one channel, one reducer, one set of pollers
//!
//! `FeedSession::connect` opens the channel, starts the pollers and returns
//! the owning handle. `dispose` (or dropping the session) closes the channel,
//! cancels pending reconnects, overlay timers and poll tasks.

use chrono::{DateTime, Utc};
use hypersockets::{ClientEvent, ConnectionState, HyperSocketError, WebSocketClient};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::overlay::{OverlaySlot, OverlayState, OverlayTimer};
use super::poller::PollSynchronizer;
use super::reducer::LiveState;
use crate::domain::{Match, MatchId, ReferenceData};
use crate::infrastructure::client::{build_feed_client, feed_url, FeedHandler};
use crate::infrastructure::{FeedConfig, ReferenceApiError, ReferenceSource, RestReferenceClient};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session already disposed")]
    Disposed,

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("WebSocket error: {0}")]
    Socket(#[from] HyperSocketError),

    #[error("Reference API error: {0}")]
    Reference(#[from] ReferenceApiError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

pub struct FeedSession {
    config: FeedConfig,
    scope: Option<MatchId>,
    live: Arc<Mutex<LiveState>>,
    reference: Arc<Mutex<ReferenceData>>,
    overlay: OverlayTimer,
    poller: PollSynchronizer,
    client: tokio::sync::Mutex<Option<WebSocketClient>>,
    disposed: AtomicBool,
}

impl FeedSession {
    /// Open a session against the configured feed and REST API.
    ///
    /// `scope` limits the channel to a single match.
    pub async fn connect(config: FeedConfig, scope: Option<MatchId>) -> Result<Self> {
        let source = RestReferenceClient::new(config.api_url.clone(), config.request_timeout())?;
        Self::connect_with_source(config, scope, Arc::new(source)).await
    }

    /// Same as [`FeedSession::connect`] with a caller-supplied reference source
    pub async fn connect_with_source(
        config: FeedConfig,
        scope: Option<MatchId>,
        source: Arc<dyn ReferenceSource>,
    ) -> Result<Self> {
        let live = Arc::new(Mutex::new(LiveState::default()));
        let reference = Arc::new(Mutex::new(ReferenceData::default()));
        let overlay = OverlayTimer::new(config.point_flash_lifetime(), config.banner_lifetime());
        let poller = PollSynchronizer::new(
            source,
            Arc::clone(&reference),
            Arc::clone(&live),
            config.poll_settings(),
        );

        let session = Self {
            config,
            scope,
            live,
            reference,
            overlay,
            poller,
            client: tokio::sync::Mutex::new(None),
            disposed: AtomicBool::new(false),
        };

        session.ensure_connected().await?;
        session.poller.start();

        info!(
            "[Feed] Session open (role: {}, scope: {})",
            session.config.role.as_str(),
            session.scope.as_deref().unwrap_or("all matches")
        );
        Ok(session)
    }

    /// Open the channel unless this session already has one.
    pub async fn ensure_connected(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(SessionError::Disposed);
        }

        let mut client = self.client.lock().await;
        if client.is_some() {
            debug!("[Feed] Channel already running");
            return Ok(());
        }

        let url = feed_url(&self.config.ws_url, self.config.role, self.scope.as_deref())
            .map_err(SessionError::InvalidUrl)?;
        let handler = FeedHandler::new(Arc::clone(&self.live), self.overlay.clone());
        let built = build_feed_client(
            &url,
            handler,
            self.config.base_delay(),
            self.config.max_delay(),
        )
        .await?;
        *client = Some(built);
        Ok(())
    }

    /// Copy of the live match state
    pub fn snapshot(&self) -> LiveState {
        self.live.lock().clone()
    }

    pub fn get_match(&self, id: &str) -> Option<Match> {
        self.live.lock().get(id).cloned()
    }

    /// Copy of the poll-refreshed reference data
    pub fn reference(&self) -> ReferenceData {
        self.reference.lock().clone()
    }

    pub fn overlay(&self, slot: OverlaySlot) -> OverlayState {
        self.overlay.state(slot)
    }

    /// When the last feed frame was applied
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.live.lock().last_update
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Connectivity indicator
    pub async fn connection_state(&self) -> ConnectionState {
        if self.is_disposed() {
            return ConnectionState::ShutDown;
        }
        match self.client.lock().await.as_ref() {
            Some(client) => client.connection_state(),
            None => ConnectionState::Closed,
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.connection_state().await == ConnectionState::Open
    }

    /// Consecutive failed attempts since the last open
    pub async fn reconnect_attempts(&self) -> usize {
        match self.client.lock().await.as_ref() {
            Some(client) => client.reconnect_attempts(),
            None => 0,
        }
    }

    /// Pending transport events, oldest first
    pub async fn drain_events(&self) -> Vec<ClientEvent> {
        let client = self.client.lock().await;
        let Some(client) = client.as_ref() else {
            return Vec::new();
        };
        std::iter::from_fn(|| client.try_recv_event()).collect()
    }

    /// Re-fetch recent results now
    pub async fn refresh_recent_results(&self) {
        if self.is_disposed() {
            return;
        }
        self.poller.refresh_recent_results().await;
    }

    /// Close the channel and cancel every timer this session owns.
    ///
    /// Idempotent. Live and reference data stay readable afterwards.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("[Feed] Disposing session");

        self.poller.stop();
        self.overlay.dispose();

        let client = self.client.lock().await.take();
        if let Some(client) = client {
            if let Err(e) = client.shutdown().await {
                warn!("[Feed] Error during shutdown: {}", e);
            }
        }
        info!("[Feed] Session closed");
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            debug!("[Feed] Session dropped without dispose, tearing down");
            self.poller.stop();
            self.overlay.dispose();
            // Dropping the client aborts its task
            drop(self.client.get_mut().take());
        }
    }
}
