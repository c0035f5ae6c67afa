//! Display loop runner
//!
//! Shared startup/shutdown framing for binaries that redraw a scoreboard on
//! a fixed cadence and log a status line now and then.

use std::time::Duration;
use tracing::info;

/// Cadence of a display binary
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name shown in the banners
    pub name: String,
    /// Time between two redraws
    pub frame_interval: Duration,
    /// Time between two status lines
    pub status_interval: Duration,
}

impl RunConfig {
    /// One redraw per second, a status line every 30 seconds
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame_interval: Duration::from_secs(1),
            status_interval: Duration::from_secs(30),
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Whether a status line is due, given when the last one was logged
    pub fn status_due(&self, since_last: Duration) -> bool {
        since_last >= self.status_interval
    }
}

/// A binary that owns a redraw loop
pub trait BinaryRunner {
    /// Redraw until shutdown
    async fn run(&mut self) -> anyhow::Result<()>;

    fn config(&self) -> &RunConfig;

    /// Summary for the shutdown banner
    fn stats(&self) -> Option<String> {
        None
    }

    fn print_banner(&self) {
        let config = self.config();
        info!("========================================");
        info!("{}", config.name);
        info!(
            "Redraw every {:?}, status every {:?}",
            config.frame_interval, config.status_interval
        );
        info!("Press Ctrl+C to stop");
        info!("========================================");
    }

    fn print_shutdown(&self, stats: Option<&str>) {
        info!("========================================");
        info!("{} closed", self.config().name);
        if let Some(stats) = stats {
            info!("{}", stats);
        }
        info!("========================================");
    }

    /// Banner, loop, shutdown banner. The loop's result is returned as is.
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let result = self.run().await;
        let stats = self.stats();
        self.print_shutdown(stats.as_deref());
        result
    }
}
