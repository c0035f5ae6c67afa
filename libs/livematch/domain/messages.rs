//! Wire messages received over the live channel
//!
//! Every frame is a JSON object with a `type` tag. Unknown tags decode to
//! [`FeedMessage::Unrecognized`] so new server message kinds never break
//! older clients.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::models::{deserialize_opt_id, Match, MatchId, Side};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed feed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid match record {id}: {reason}")]
    InvalidRecord { id: MatchId, reason: String },
}

/// Situation flag attached to a scored point (`situacion` entries)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Situation {
    pub tipo: String,
    #[serde(default)]
    pub jugador: Option<Side>,
}

/// Situation kinds the scoreboard reacts to, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SituationKind {
    MatchPoint,
    SetPoint,
    Deuce,
}

impl SituationKind {
    pub fn parse(tipo: &str) -> Option<Self> {
        match tipo {
            "match_point" => Some(SituationKind::MatchPoint),
            "set_point" => Some(SituationKind::SetPoint),
            "deuce" => Some(SituationKind::Deuce),
            _ => None,
        }
    }
}

impl Situation {
    pub fn kind(&self) -> Option<SituationKind> {
        SituationKind::parse(&self.tipo)
    }
}

/// The point that was just scored
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Point {
    pub jugador: Side,
}

/// Payload of a `point_scored` message
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointScored {
    /// Authoritative record after the point
    #[serde(rename = "match")]
    pub record: Match,
    #[serde(default)]
    pub point: Option<Point>,
    #[serde(default)]
    pub situacion: Vec<Situation>,
    #[serde(default)]
    pub set_ganado: bool,
    #[serde(default)]
    pub ganador_set: Option<Side>,
    #[serde(default)]
    pub partido_terminado: bool,
    #[serde(default)]
    pub ganador_partido: Option<Side>,
}

impl PointScored {
    /// Strongest situation flag carried by the point, if any
    pub fn strongest_situation(&self) -> Option<(SituationKind, Option<Side>)> {
        self.situacion
            .iter()
            .filter_map(|s| s.kind().map(|kind| (kind, s.jugador)))
            .min_by_key(|(kind, _)| *kind)
    }
}

/// One decoded feed frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Connected {
        #[serde(default, deserialize_with = "deserialize_opt_id")]
        client_id: Option<String>,
    },
    MatchState {
        #[serde(rename = "match")]
        record: Match,
    },
    ActiveMatches {
        #[serde(default)]
        matches: Vec<Match>,
    },
    PointScored(PointScored),
    PointUndone {
        #[serde(rename = "match")]
        record: Match,
    },
    MatchStarted {
        #[serde(rename = "match")]
        record: Match,
    },
    MatchPaused {
        #[serde(rename = "match", default)]
        record: Option<Match>,
    },
    Timeout {
        /// Timeout length, sent in seconds
        #[serde(default, deserialize_with = "deserialize_opt_secs")]
        duracion: Option<Duration>,
        #[serde(default)]
        jugador: Option<Side>,
        #[serde(default, deserialize_with = "deserialize_opt_id")]
        match_id: Option<MatchId>,
    },
    Ping,
    #[serde(other)]
    Unrecognized,
}

impl FeedMessage {
    /// Wire tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            FeedMessage::Connected { .. } => "connected",
            FeedMessage::MatchState { .. } => "match_state",
            FeedMessage::ActiveMatches { .. } => "active_matches",
            FeedMessage::PointScored(_) => "point_scored",
            FeedMessage::PointUndone { .. } => "point_undone",
            FeedMessage::MatchStarted { .. } => "match_started",
            FeedMessage::MatchPaused { .. } => "match_paused",
            FeedMessage::Timeout { .. } => "timeout",
            FeedMessage::Ping => "ping",
            FeedMessage::Unrecognized => "unrecognized",
        }
    }

    /// Match records embedded in the message
    pub fn records(&self) -> Vec<&Match> {
        match self {
            FeedMessage::MatchState { record }
            | FeedMessage::PointUndone { record }
            | FeedMessage::MatchStarted { record } => vec![record],
            FeedMessage::PointScored(p) => vec![&p.record],
            FeedMessage::MatchPaused { record } => record.iter().collect(),
            FeedMessage::ActiveMatches { matches } => matches.iter().collect(),
            FeedMessage::Connected { .. }
            | FeedMessage::Timeout { .. }
            | FeedMessage::Ping
            | FeedMessage::Unrecognized => Vec::new(),
        }
    }
}

/// Decode one text frame and validate every embedded match record
pub fn decode(text: &str) -> Result<FeedMessage, DecodeError> {
    let message: FeedMessage = serde_json::from_str(text)?;
    for record in message.records() {
        record.validate()?;
    }
    Ok(message)
}

/// Seconds as an integer, a float or a numeric string.
///
/// Anything else reads as "no duration" so the timeout itself still shows.
fn deserialize_opt_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(secs.and_then(|secs| Duration::try_from_secs_f64(secs).ok()))
}
