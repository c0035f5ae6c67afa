//! Poll synchronizer for reference data
//!
//! Rankings on mount and every `rankings_interval`, recent results on mount
//! and on demand, sponsors on mount and every `sponsors_interval`. Each
//! sponsor slot gets its own rotation ticker. Results go into
//! [`ReferenceData`] only; the single exception is retiring finished
//! matches listed in recent results from the live set.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::reducer::LiveState;
use crate::domain::ReferenceData;
use crate::infrastructure::ReferenceSource;

/// Cadences and limits for the pollers
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub rankings_interval: Duration,
    pub rankings_limit: u32,
    pub recent_results_limit: u32,
    pub sponsors_interval: Duration,
    pub default_rotation: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            rankings_interval: Duration::from_secs(60),
            rankings_limit: 10,
            recent_results_limit: 10,
            sponsors_interval: Duration::from_secs(300),
            default_rotation: Duration::from_secs(10),
        }
    }
}

struct RotationTask {
    interval: Duration,
    handle: JoinHandle<()>,
}

/// State shared by the poll tasks
struct PollShared {
    source: Arc<dyn ReferenceSource>,
    reference: Arc<Mutex<ReferenceData>>,
    live: Arc<Mutex<LiveState>>,
    settings: PollSettings,
    running: AtomicBool,
    rotations: Mutex<HashMap<String, RotationTask>>,
}

pub struct PollSynchronizer {
    shared: Arc<PollShared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PollSynchronizer {
    pub fn new(
        source: Arc<dyn ReferenceSource>,
        reference: Arc<Mutex<ReferenceData>>,
        live: Arc<Mutex<LiveState>>,
        settings: PollSettings,
    ) -> Self {
        Self {
            shared: Arc::new(PollShared {
                source,
                reference,
                live,
                settings,
                running: AtomicBool::new(false),
                rotations: Mutex::new(HashMap::new()),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.shared.settings
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Spawn the pollers. Calling it again while running does nothing.
    pub fn start(&self) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(
            "[Poll] Starting: rankings every {:?}, sponsors every {:?}",
            self.shared.settings.rankings_interval, self.shared.settings.sponsors_interval
        );

        let mut tasks = self.tasks.lock();

        let shared = Arc::clone(&self.shared);
        tasks.push(tokio::spawn(async move {
            shared.load_recent_results().await;
        }));

        let shared = Arc::clone(&self.shared);
        tasks.push(tokio::spawn(async move {
            let mut ticker = interval(shared.settings.rankings_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                shared.load_rankings().await;
            }
        }));

        let shared = Arc::clone(&self.shared);
        tasks.push(tokio::spawn(async move {
            let mut ticker = interval(shared.settings.sponsors_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if shared.load_sponsors().await {
                    PollShared::sync_rotations(&shared);
                }
            }
        }));
    }

    /// Re-fetch recent results now. No-op once stopped.
    pub async fn refresh_recent_results(&self) {
        self.shared.load_recent_results().await;
    }

    /// Abort every poll and rotation task
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        for (_, rotation) in self.shared.rotations.lock().drain() {
            rotation.handle.abort();
        }
        debug!("[Poll] Stopped");
    }
}

impl Drop for PollSynchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl PollShared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    async fn load_rankings(&self) {
        if !self.is_running() {
            return;
        }
        match self.source.rankings(self.settings.rankings_limit).await {
            Ok(rankings) => {
                debug!("[Poll] Rankings refreshed ({} rows)", rankings.len());
                self.reference.lock().replace_rankings(rankings);
            }
            Err(e) => warn!("[Poll] Rankings poll failed, keeping previous data: {}", e),
        }
    }

    async fn load_recent_results(&self) {
        if !self.is_running() {
            return;
        }
        match self.source.recent_results(self.settings.recent_results_limit).await {
            Ok(results) => {
                let ids = {
                    let mut reference = self.reference.lock();
                    reference.replace_recent_results(results);
                    reference.recent_result_ids()
                };
                let retired = self.live.lock().retire_finished(&ids);
                debug!(
                    "[Poll] Recent results refreshed ({} rows, {} finished matches retired)",
                    ids.len(),
                    retired
                );
            }
            Err(e) => warn!("[Poll] Recent results poll failed, keeping previous data: {}", e),
        }
    }

    async fn load_sponsors(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        match self.source.sponsors().await {
            Ok(sets) => {
                debug!("[Poll] Sponsors refreshed ({} slots)", sets.len());
                self.reference
                    .lock()
                    .replace_sponsors(sets, self.settings.default_rotation);
                true
            }
            Err(e) => {
                warn!("[Poll] Sponsors poll failed, keeping previous data: {}", e);
                false
            }
        }
    }

    /// Align rotation tickers with the current sponsor slots.
    ///
    /// Tickers whose slot and interval are unchanged keep their phase.
    fn sync_rotations(shared: &Arc<PollShared>) {
        if !shared.is_running() {
            return;
        }
        let slots: HashMap<String, Duration> = shared
            .reference
            .lock()
            .sponsors
            .iter()
            .map(|(slot, rotation)| (slot.clone(), rotation.interval))
            .collect();

        let mut rotations = shared.rotations.lock();
        rotations.retain(|slot, task| {
            let keep = slots.get(slot) == Some(&task.interval);
            if !keep {
                task.handle.abort();
            }
            keep
        });

        for (slot, every) in slots {
            if rotations.contains_key(&slot) {
                continue;
            }
            let handle = tokio::spawn(rotate_slot(Arc::clone(shared), slot.clone(), every));
            rotations.insert(
                slot,
                RotationTask {
                    interval: every,
                    handle,
                },
            );
        }
    }
}

async fn rotate_slot(shared: Arc<PollShared>, slot: String, every: Duration) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if !shared.is_running() {
            break;
        }
        match shared.reference.lock().rotate_slot(&slot) {
            Some(index) => debug!("[Poll] Sponsor slot {} now at {}", slot, index),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Match, MatchStatus, SponsorSet};
    use crate::infrastructure::client::reference_api::{ReferenceApiError, Result as ApiResult};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    #[derive(Default)]
    struct FakeSource {
        rankings_calls: AtomicUsize,
        results_calls: AtomicUsize,
        sponsor_calls: AtomicUsize,
        fail_rankings_after: Option<usize>,
    }

    impl FakeSource {
        fn calls(&self) -> (usize, usize, usize) {
            (
                self.rankings_calls.load(Ordering::SeqCst),
                self.results_calls.load(Ordering::SeqCst),
                self.sponsor_calls.load(Ordering::SeqCst),
            )
        }
    }

    #[async_trait]
    impl ReferenceSource for FakeSource {
        async fn rankings(&self, limit: u32) -> ApiResult<Vec<Value>> {
            let n = self.rankings_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_rankings_after.is_some_and(|after| n >= after) {
                return Err(ReferenceApiError::ApiError("down".to_string()));
            }
            Ok((0..limit).map(|i| json!({"pos": i + 1, "poll": n})).collect())
        }

        async fn recent_results(&self, _limit: u32) -> ApiResult<Vec<Value>> {
            self.results_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![json!({"id": "M9"}), json!({"id": "M1"})])
        }

        async fn sponsors(&self) -> ApiResult<Vec<SponsorSet>> {
            self.sponsor_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![SponsorSet {
                slot: "main".to_string(),
                rotation_secs: None,
                entries: vec![json!("a"), json!("b"), json!("c")],
            }])
        }
    }

    fn live_with_matches() -> LiveState {
        let mut live = LiveState::default();
        let mut playing = Match::new("M1");
        playing.estado = MatchStatus::InProgress;
        let mut done = Match::new("M9");
        done.estado = MatchStatus::Finished;
        live.matches.insert("M1".to_string(), playing);
        live.matches.insert("M9".to_string(), done);
        live
    }

    fn make_poller(
        source: Arc<FakeSource>,
        live: LiveState,
    ) -> (PollSynchronizer, Arc<Mutex<ReferenceData>>, Arc<Mutex<LiveState>>) {
        let reference = Arc::new(Mutex::new(ReferenceData::default()));
        let live = Arc::new(Mutex::new(live));
        let settings = PollSettings {
            rankings_limit: 3,
            ..PollSettings::default()
        };
        let poller = PollSynchronizer::new(source, Arc::clone(&reference), Arc::clone(&live), settings);
        (poller, reference, live)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_and_cadences() {
        let source = Arc::new(FakeSource::default());
        let (poller, reference, _live) = make_poller(Arc::clone(&source), LiveState::default());
        poller.start();

        sleep(Duration::from_millis(10)).await;
        assert_eq!(source.calls(), (1, 1, 1));
        assert_eq!(reference.lock().rankings.len(), 3);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), (2, 1, 1));

        sleep(Duration::from_secs(240)).await;
        assert_eq!(source.calls(), (6, 1, 2));

        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sponsor_rotation_visits_each_entry_in_order() {
        let source = Arc::new(FakeSource::default());
        let (poller, reference, _live) = make_poller(source, LiveState::default());
        poller.start();

        sleep(Duration::from_millis(10)).await;
        let mut seen = vec![reference.lock().sponsors["main"].index];
        for _ in 0..4 {
            sleep(Duration::from_secs(10)).await;
            seen.push(reference.lock().sponsors["main"].index);
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1]);

        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_keeps_previous_rankings() {
        let source = Arc::new(FakeSource {
            fail_rankings_after: Some(1),
            ..FakeSource::default()
        });
        let (poller, reference, _live) = make_poller(source, LiveState::default());
        poller.start();

        sleep(Duration::from_millis(10)).await;
        let first = reference.lock().rankings.clone();
        assert_eq!(first.len(), 3);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(reference.lock().rankings, first);

        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_never_touch_live_matches_except_retiring_finished() {
        let source = Arc::new(FakeSource::default());
        let before = live_with_matches();
        let (poller, _reference, live) = make_poller(source, before.clone());
        poller.start();

        sleep(Duration::from_secs(61)).await;
        let after = live.lock().clone();
        assert_eq!(after.get("M1"), before.get("M1"));
        assert!(after.get("M9").is_none());

        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_everything() {
        let source = Arc::new(FakeSource::default());
        let (poller, reference, _live) = make_poller(Arc::clone(&source), LiveState::default());
        poller.start();
        sleep(Duration::from_millis(10)).await;

        poller.stop();
        let calls = source.calls();
        let snapshot = reference.lock().clone();

        sleep(Duration::from_secs(3_600)).await;
        poller.refresh_recent_results().await;
        assert_eq!(source.calls(), calls);
        assert_eq!(*reference.lock(), snapshot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_recent_results_on_demand() {
        let source = Arc::new(FakeSource::default());
        let (poller, reference, _live) = make_poller(Arc::clone(&source), LiveState::default());
        poller.start();
        sleep(Duration::from_millis(10)).await;

        poller.refresh_recent_results().await;
        assert_eq!(source.calls().1, 2);
        assert_eq!(reference.lock().recent_result_ids(), vec!["M9", "M1"]);

        poller.stop();
    }
}
