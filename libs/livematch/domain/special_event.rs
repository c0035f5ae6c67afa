//! Transient scoreboard signals derived from feed messages.
//!
//! Nothing here is persisted or replayed after a reconnect.

use serde::Serialize;
use std::time::Duration;

use super::models::{MatchId, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialEventKind {
    MatchPoint,
    SetPoint,
    Deuce,
    SetWon,
    MatchWon,
    Timeout,
    Paused,
    Started,
}

impl SpecialEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SpecialEventKind::MatchPoint => "match_point",
            SpecialEventKind::SetPoint => "set_point",
            SpecialEventKind::Deuce => "deuce",
            SpecialEventKind::SetWon => "set_won",
            SpecialEventKind::MatchWon => "match_won",
            SpecialEventKind::Timeout => "timeout",
            SpecialEventKind::Paused => "paused",
            SpecialEventKind::Started => "started",
        }
    }
}

/// Banner-worthy event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecialEvent {
    pub kind: SpecialEventKind,
    pub match_id: Option<MatchId>,
    /// Player the event concerns
    pub player: Option<Side>,
    /// Secondary line, e.g. the winner's name
    pub subtext: Option<String>,
    /// Only set for timeouts
    pub duration: Option<Duration>,
}

impl SpecialEvent {
    pub fn new(kind: SpecialEventKind, match_id: Option<MatchId>) -> Self {
        Self {
            kind,
            match_id,
            player: None,
            subtext: None,
            duration: None,
        }
    }

    pub fn with_player(mut self, player: Option<Side>) -> Self {
        self.player = player;
        self
    }

    pub fn with_subtext(mut self, subtext: impl Into<String>) -> Self {
        self.subtext = Some(subtext.into());
        self
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }
}

/// Output of the reducer besides the new state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Flash the scoring player's counter
    PointFlash { match_id: MatchId, player: Side },
    /// A point was rolled back
    UndoFlash { match_id: MatchId },
    Special(SpecialEvent),
}
