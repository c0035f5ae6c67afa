//! Event reducer: folds one feed message into live match state
//!
//! `reduce` is a pure function of (state, message). It never looks at the
//! clock or the network, which keeps it testable apart from the transport.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::domain::{
    FeedMessage, Match, MatchId, MatchStatus, PointScored, Signal, SituationKind, SpecialEvent,
    SpecialEventKind,
};

/// Live match state owned by one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveState {
    /// Identity assigned by the server on `connected` (diagnostic only)
    pub client_id: Option<String>,
    /// Active match set keyed by id
    pub matches: BTreeMap<MatchId, Match>,
    /// Wall-clock time of the last handled frame, stamped by the feed handler
    pub last_update: Option<DateTime<Utc>>,
}

impl LiveState {
    pub fn get(&self, id: &str) -> Option<&Match> {
        self.matches.get(id)
    }

    /// Drop finished matches that a recent-results poll lists.
    ///
    /// Entries that are still live are left alone. Returns how many were removed.
    pub fn retire_finished(&mut self, ids: &[MatchId]) -> usize {
        let before = self.matches.len();
        for id in ids {
            if self.matches.get(id).is_some_and(Match::is_finished) {
                self.matches.remove(id);
            }
        }
        before - self.matches.len()
    }
}

/// New state plus the signals the message produced
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub state: LiveState,
    pub signals: Vec<Signal>,
}

/// Apply one message.
///
/// Records for finished matches and records that would move a match
/// backwards in its lifecycle are ignored together with their signals.
pub fn reduce(mut state: LiveState, message: FeedMessage) -> Reduction {
    let mut signals = Vec::new();

    match message {
        FeedMessage::Connected { client_id } => {
            debug!("[Feed] Connected as client {:?}", client_id);
            state.client_id = client_id;
        }
        FeedMessage::MatchState { record } => {
            apply_record(&mut state.matches, record);
        }
        FeedMessage::ActiveMatches { matches } => {
            debug!("[Feed] Replacing active set with {} matches", matches.len());
            let mut previous = std::mem::take(&mut state.matches);
            for record in matches {
                let kept = match previous.remove(&record.id) {
                    Some(current) if !accepts(&current, &record) => current,
                    _ => record,
                };
                state.matches.insert(kept.id.clone(), kept);
            }
        }
        FeedMessage::PointScored(point) => {
            signals = point_scored(&mut state.matches, point);
        }
        FeedMessage::PointUndone { record } => {
            let match_id = record.id.clone();
            if apply_record(&mut state.matches, record) {
                signals.push(Signal::UndoFlash { match_id });
            }
        }
        FeedMessage::MatchStarted { mut record } => {
            if record.estado == MatchStatus::Pending {
                record.estado = MatchStatus::InProgress;
            }
            let match_id = record.id.clone();
            if apply_record(&mut state.matches, record) {
                signals.push(Signal::Special(SpecialEvent::new(
                    SpecialEventKind::Started,
                    Some(match_id),
                )));
            }
        }
        FeedMessage::MatchPaused { record } => {
            let match_id = match record {
                Some(mut record) => {
                    record.estado = MatchStatus::Paused;
                    let id = record.id.clone();
                    if !apply_record(&mut state.matches, record) {
                        return Reduction { state, signals };
                    }
                    Some(id)
                }
                None => None,
            };
            signals.push(Signal::Special(SpecialEvent::new(
                SpecialEventKind::Paused,
                match_id,
            )));
        }
        FeedMessage::Timeout {
            duracion,
            jugador,
            match_id,
        } => {
            signals.push(Signal::Special(
                SpecialEvent::new(SpecialEventKind::Timeout, match_id)
                    .with_player(jugador)
                    .with_duration(duracion),
            ));
        }
        FeedMessage::Ping => {}
        FeedMessage::Unrecognized => {
            debug!("[Feed] Ignoring unrecognized message type");
        }
    }

    Reduction { state, signals }
}

/// Last-write-wins replacement guarded by the status lifecycle
fn apply_record(matches: &mut BTreeMap<MatchId, Match>, record: Match) -> bool {
    if let Some(current) = matches.get(&record.id) {
        if !accepts(current, &record) {
            return false;
        }
    }
    matches.insert(record.id.clone(), record);
    true
}

/// Whether `record` may replace `current`
fn accepts(current: &Match, record: &Match) -> bool {
    if current.is_finished() {
        debug!(match_id = %record.id, "[Feed] Ignoring update for finished match");
        return false;
    }
    if !current.estado.can_transition_to(record.estado) {
        warn!(
            match_id = %record.id,
            from = %current.estado,
            to = %record.estado,
            "[Feed] Ignoring status regression"
        );
        return false;
    }
    true
}

fn point_scored(matches: &mut BTreeMap<MatchId, Match>, point: PointScored) -> Vec<Signal> {
    let banner = point_banner(&point);
    let flash = point.point.as_ref().map(|p| p.jugador);

    let mut record = point.record;
    if point.partido_terminado {
        record.estado = MatchStatus::Finished;
    }
    let match_id = record.id.clone();
    if !apply_record(matches, record) {
        return Vec::new();
    }

    let mut signals = Vec::with_capacity(2);
    if let Some(player) = flash {
        signals.push(Signal::PointFlash {
            match_id,
            player,
        });
    }
    if let Some(event) = banner {
        signals.push(Signal::Special(event));
    }
    signals
}

/// Match won beats set won beats the strongest situation flag
fn point_banner(point: &PointScored) -> Option<SpecialEvent> {
    let record = &point.record;
    let match_id = Some(record.id.clone());

    if point.partido_terminado {
        let mut event =
            SpecialEvent::new(SpecialEventKind::MatchWon, match_id).with_player(point.ganador_partido);
        if let Some(winner) = point.ganador_partido {
            event = event.with_subtext(record.player_name(winner));
        }
        return Some(event);
    }

    if point.set_ganado {
        let mut event =
            SpecialEvent::new(SpecialEventKind::SetWon, match_id).with_player(point.ganador_set);
        if let Some(winner) = point.ganador_set {
            event = event.with_subtext(record.player_name(winner));
        }
        return Some(event);
    }

    let (kind, player) = point.strongest_situation()?;
    let kind = match kind {
        SituationKind::MatchPoint => SpecialEventKind::MatchPoint,
        SituationKind::SetPoint => SpecialEventKind::SetPoint,
        SituationKind::Deuce => SpecialEventKind::Deuce,
    };
    // Situation flags without a player concern the one who just scored
    let player = player.or(point.point.as_ref().map(|p| p.jugador));
    Some(SpecialEvent::new(kind, match_id).with_player(player))
}
