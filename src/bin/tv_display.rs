//! TV scoreboard display
//!
//! Opens a feed session and logs the live scoreboard, overlays and
//! connectivity until Ctrl+C.
//!
//! Usage: `tv_display [--match <id>] [--control]`

use anyhow::{Context, Result};
use scoreboard_tv::bin_common::{
    load_config_from_env, parse_args, BinaryRunner, ConfigType, FeedArgs, RunConfig,
};
use scoreboard_tv::livematch::infrastructure::handle_client_event;
use scoreboard_tv::livematch::{
    init_tracing, FeedConfig, FeedSession, Match, MatchId, OverlayDisplay, OverlaySlot,
    ShutdownManager, Side,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// What the screen last showed
type Frame = (
    BTreeMap<MatchId, Match>,
    Option<OverlayDisplay>,
    Option<OverlayDisplay>,
);

struct TvDisplay {
    run_config: RunConfig,
    feed_config: FeedConfig,
    scope: Option<String>,
    shutdown: ShutdownManager,
    last_frame: Option<Frame>,
    frames_rendered: u64,
}

impl TvDisplay {
    /// Log the scoreboard if it differs from the last frame
    fn render(&mut self, session: &FeedSession) {
        let frame: Frame = (
            session.snapshot().matches,
            session.overlay(OverlaySlot::PointFlash).display().cloned(),
            session.overlay(OverlaySlot::Banner).display().cloned(),
        );
        if self.last_frame.as_ref() == Some(&frame) {
            return;
        }

        for record in frame.0.values() {
            info!(
                "[{}] {} {} ({}) - ({}) {} {} [{}]",
                record.id,
                record.player_name(Side::A),
                record.puntos_jugador_a,
                record.sets_jugador_a,
                record.sets_jugador_b,
                record.puntos_jugador_b,
                record.player_name(Side::B),
                record.estado
            );
        }
        if let Some(flash) = &frame.1 {
            info!("  flash: {:?}", flash);
        }
        if let Some(banner) = &frame.2 {
            info!("  banner: {:?}", banner);
        }

        self.frames_rendered += 1;
        self.last_frame = Some(frame);
    }
}

impl BinaryRunner for TvDisplay {
    async fn run(&mut self) -> Result<()> {
        let session = FeedSession::connect(self.feed_config.clone(), self.scope.clone())
            .await
            .context("failed to open feed session")?;

        let frame_interval = self.run_config.frame_interval;
        let mut last_status = tokio::time::Instant::now();

        while self.shutdown.interruptible_sleep(frame_interval).await {
            for event in session.drain_events().await {
                handle_client_event(&event);
            }

            self.render(&session);

            if self.run_config.status_due(last_status.elapsed()) {
                last_status = tokio::time::Instant::now();
                let reference = session.reference();
                info!(
                    "Status: {:?}, {} live match(es), {} ranking row(s), {} reconnect attempt(s)",
                    session.connection_state().await,
                    session.snapshot().matches.len(),
                    reference.rankings.len(),
                    session.reconnect_attempts().await
                );
                if let Some(at) = session.last_update() {
                    info!("Last feed update: {}", at.format("%H:%M:%S"));
                } else {
                    warn!("No feed update received yet");
                }
            }
        }

        session.dispose().await;
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        Some(format!("Frames rendered: {}", self.frames_rendered))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = FeedArgs::parse(&parse_args());
    let config_path = load_config_from_env(ConfigType::Feed);
    let mut feed_config = FeedConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if let Some(role) = args.role {
        feed_config.role = role;
    }

    init_tracing(&feed_config.log_level);
    feed_config.log();

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let mut app = TvDisplay {
        // Redraw fast enough that a 1.5s point flash is visible
        run_config: RunConfig::new("TV Display").with_frame_interval(Duration::from_millis(250)),
        feed_config,
        scope: args.scope,
        shutdown,
        last_frame: None,
        frames_rendered: 0,
    };
    app.execute().await
}
