//! Poll-refreshed reference data: rankings, recent results, sponsors
//!
//! Records are opaque JSON values; only the recent-result `id` and the
//! sponsor slot envelope are interpreted.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::models::{deserialize_id, id_from_value, MatchId};

/// Sponsor slot as returned by `GET /sponsors`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SponsorSet {
    #[serde(deserialize_with = "deserialize_id")]
    pub slot: String,
    /// Per-slot rotation interval, falls back to the configured default
    #[serde(default)]
    pub rotation_secs: Option<u64>,
    #[serde(default)]
    pub entries: Vec<Value>,
}

/// Round-robin cursor over one slot's entries
#[derive(Debug, Clone, PartialEq)]
pub struct SponsorRotation {
    pub entries: Vec<Value>,
    pub interval: Duration,
    pub index: usize,
}

impl SponsorRotation {
    pub fn new(set: SponsorSet, default_interval: Duration) -> Self {
        let interval = match set.rotation_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => default_interval,
        };
        Self {
            entries: set.entries,
            interval,
            index: 0,
        }
    }

    /// Advance to the next entry, wrapping around. Returns the new index.
    pub fn rotate(&mut self) -> usize {
        if self.entries.is_empty() {
            self.index = 0;
        } else {
            self.index = (self.index + 1) % self.entries.len();
        }
        self.index
    }

    pub fn current(&self) -> Option<&Value> {
        self.entries.get(self.index)
    }
}

/// Everything the pollers own. Feed messages never touch this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    pub rankings: Vec<Value>,
    pub recent_results: Vec<Value>,
    pub sponsors: BTreeMap<String, SponsorRotation>,
    pub rankings_updated: Option<DateTime<Utc>>,
    pub recent_results_updated: Option<DateTime<Utc>>,
    pub sponsors_updated: Option<DateTime<Utc>>,
}

impl ReferenceData {
    pub fn replace_rankings(&mut self, rankings: Vec<Value>) {
        self.rankings = rankings;
        self.rankings_updated = Some(Utc::now());
    }

    pub fn replace_recent_results(&mut self, results: Vec<Value>) {
        self.recent_results = results;
        self.recent_results_updated = Some(Utc::now());
    }

    /// Replace all sponsor slots.
    ///
    /// A slot that survives the reload keeps its index while it is still in
    /// range of the new entry list, otherwise it starts over at 0.
    pub fn replace_sponsors(&mut self, sets: Vec<SponsorSet>, default_interval: Duration) {
        let mut next = BTreeMap::new();
        for set in sets {
            let slot = set.slot.clone();
            let mut rotation = SponsorRotation::new(set, default_interval);
            if let Some(previous) = self.sponsors.get(&slot) {
                if previous.index < rotation.entries.len() {
                    rotation.index = previous.index;
                }
            }
            next.insert(slot, rotation);
        }
        self.sponsors = next;
        self.sponsors_updated = Some(Utc::now());
    }

    /// Rotate one slot. `None` if the slot no longer exists.
    pub fn rotate_slot(&mut self, slot: &str) -> Option<usize> {
        self.sponsors.get_mut(slot).map(SponsorRotation::rotate)
    }

    pub fn current_sponsor(&self, slot: &str) -> Option<&Value> {
        self.sponsors.get(slot).and_then(SponsorRotation::current)
    }

    /// Ids of the recent finished matches
    pub fn recent_result_ids(&self) -> Vec<MatchId> {
        self.recent_results
            .iter()
            .filter_map(|record| record.get("id").and_then(id_from_value))
            .collect()
    }
}
