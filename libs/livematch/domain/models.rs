//! Match records as delivered by the live feed

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::messages::DecodeError;

/// Opaque match identifier. The backend sends either strings or integers.
pub type MatchId = String;

/// Default best-of ceiling when a record omits `mejor_de`
pub const DEFAULT_BEST_OF: u32 = 5;

/// One of the two players in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match lifecycle status.
///
/// `pending -> in_progress <-> paused -> finished`; nothing leaves `finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Pending,
    InProgress,
    Paused,
    Finished,
}

impl MatchStatus {
    fn rank(self) -> u8 {
        match self {
            MatchStatus::Pending => 0,
            MatchStatus::InProgress | MatchStatus::Paused => 1,
            MatchStatus::Finished => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == MatchStatus::Finished
    }

    /// Whether a record in `self` may be replaced by one in `next`.
    ///
    /// Forward skips (a snapshot jumping from `pending` straight to
    /// `finished`) are allowed, regressions are not.
    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Paused => "paused",
            MatchStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of client opens the channel (`type=` query parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    /// Passive display (TV scoreboard)
    #[default]
    Tv,
    /// Arbiter / score-keeping client
    Control,
}

impl ClientRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientRole::Tv => "tv",
            ClientRole::Control => "control",
        }
    }
}

/// Player as embedded in a match record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRef {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(default, alias = "name")]
    pub nombre: String,
    #[serde(default)]
    pub apellido: Option<String>,
}

impl PlayerRef {
    pub fn display_name(&self) -> String {
        match self.apellido.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {}", self.nombre, last),
            _ => self.nombre.clone(),
        }
    }
}

/// Final score of one completed set, `[a, b]` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore(pub u32, pub u32);

/// A single ping-pong contest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: MatchId,
    #[serde(default)]
    pub jugador_a: Option<PlayerRef>,
    #[serde(default)]
    pub jugador_b: Option<PlayerRef>,
    #[serde(default)]
    pub puntos_jugador_a: u32,
    #[serde(default)]
    pub puntos_jugador_b: u32,
    #[serde(default)]
    pub sets_jugador_a: u32,
    #[serde(default)]
    pub sets_jugador_b: u32,
    #[serde(default = "default_current_set")]
    pub set_actual: u32,
    #[serde(default)]
    pub saque: Option<Side>,
    #[serde(default)]
    pub estado: MatchStatus,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub mesa: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub ronda: Option<String>,
    #[serde(default)]
    pub sets_detalle: Vec<SetScore>,
    #[serde(default = "default_best_of")]
    pub mejor_de: u32,
}

fn default_current_set() -> u32 {
    1
}

fn default_best_of() -> u32 {
    DEFAULT_BEST_OF
}

impl Match {
    /// Empty pending match, mostly useful as a starting point in tests
    pub fn new(id: impl Into<MatchId>) -> Self {
        Self {
            id: id.into(),
            jugador_a: None,
            jugador_b: None,
            puntos_jugador_a: 0,
            puntos_jugador_b: 0,
            sets_jugador_a: 0,
            sets_jugador_b: 0,
            set_actual: default_current_set(),
            saque: None,
            estado: MatchStatus::Pending,
            mesa: None,
            ronda: None,
            sets_detalle: Vec::new(),
            mejor_de: DEFAULT_BEST_OF,
        }
    }

    /// Sets a player needs to win the match
    pub fn sets_to_win(&self) -> u32 {
        self.mejor_de / 2 + 1
    }

    pub fn points(&self, side: Side) -> u32 {
        match side {
            Side::A => self.puntos_jugador_a,
            Side::B => self.puntos_jugador_b,
        }
    }

    pub fn sets(&self, side: Side) -> u32 {
        match side {
            Side::A => self.sets_jugador_a,
            Side::B => self.sets_jugador_b,
        }
    }

    pub fn player(&self, side: Side) -> Option<&PlayerRef> {
        match side {
            Side::A => self.jugador_a.as_ref(),
            Side::B => self.jugador_b.as_ref(),
        }
    }

    /// Display name for a side, falling back to "Player A"/"Player B"
    pub fn player_name(&self, side: Side) -> String {
        self.player(side)
            .map(PlayerRef::display_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Player {}", side.as_str().to_uppercase()))
    }

    pub fn is_finished(&self) -> bool {
        self.estado.is_terminal()
    }

    /// Reject records that break the best-of ceiling
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.mejor_de == 0 {
            return Err(DecodeError::InvalidRecord {
                id: self.id.clone(),
                reason: "mejor_de must be greater than 0".to_string(),
            });
        }

        let needed = self.sets_to_win();
        for side in [Side::A, Side::B] {
            if self.sets(side) > needed {
                return Err(DecodeError::InvalidRecord {
                    id: self.id.clone(),
                    reason: format!(
                        "player {} has {} sets, best of {} allows {}",
                        side,
                        self.sets(side),
                        self.mejor_de,
                        needed
                    ),
                });
            }
        }

        if self.sets_jugador_a == needed && self.sets_jugador_b == needed {
            return Err(DecodeError::InvalidRecord {
                id: self.id.clone(),
                reason: "both players cannot have won the match".to_string(),
            });
        }

        Ok(())
    }
}

/// Render a JSON id (string or number) as a string
pub(crate) fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected string or number id, got {}", value)))
}

pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => id_from_value(&v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected string or number, got {}", v))),
    }
}
