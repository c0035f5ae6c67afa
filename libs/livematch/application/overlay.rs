//! Special-event overlay timer
//!
//! Two independent slots (point flash and banner), each an explicit
//! `Idle -> Showing { token, expires_at } -> Idle` state machine. A new
//! trigger replaces the current display at once and supersedes its clear
//! timer; clears are token-checked so a stale timer can never blank a newer
//! display.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{MatchId, Side, Signal, SpecialEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlaySlot {
    PointFlash,
    Banner,
}

/// What a slot is currently showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayDisplay {
    Point { match_id: MatchId, player: Side },
    Undo { match_id: MatchId },
    Special(SpecialEvent),
}

impl OverlayDisplay {
    pub fn slot(&self) -> OverlaySlot {
        match self {
            OverlayDisplay::Point { .. } | OverlayDisplay::Undo { .. } => OverlaySlot::PointFlash,
            OverlayDisplay::Special(_) => OverlaySlot::Banner,
        }
    }
}

impl From<Signal> for OverlayDisplay {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::PointFlash { match_id, player } => OverlayDisplay::Point { match_id, player },
            Signal::UndoFlash { match_id } => OverlayDisplay::Undo { match_id },
            Signal::Special(event) => OverlayDisplay::Special(event),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Idle,
    Showing {
        token: u64,
        expires_at: Instant,
        display: OverlayDisplay,
    },
}

impl OverlayState {
    pub fn display(&self) -> Option<&OverlayDisplay> {
        match self {
            OverlayState::Idle => None,
            OverlayState::Showing { display, .. } => Some(display),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, OverlayState::Idle)
    }
}

#[derive(Default)]
struct SlotState {
    state: OverlayState,
    timer: Option<AbortHandle>,
}

impl SlotState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[derive(Default)]
struct OverlayInner {
    next_token: u64,
    flash: SlotState,
    banner: SlotState,
    disposed: bool,
}

impl OverlayInner {
    fn slot_mut(&mut self, slot: OverlaySlot) -> &mut SlotState {
        match slot {
            OverlaySlot::PointFlash => &mut self.flash,
            OverlaySlot::Banner => &mut self.banner,
        }
    }

    fn slot(&self, slot: OverlaySlot) -> &SlotState {
        match slot {
            OverlaySlot::PointFlash => &self.flash,
            OverlaySlot::Banner => &self.banner,
        }
    }

    /// `Showing(token) -> Idle`, only if `token` is still the current one
    fn clear(&mut self, slot: OverlaySlot, token: u64) -> bool {
        let slot = self.slot_mut(slot);
        let is_current = matches!(
            &slot.state,
            OverlayState::Showing { token: current, .. } if *current == token
        );
        if !is_current {
            return false;
        }
        slot.state = OverlayState::Idle;
        slot.timer = None;
        true
    }
}

/// Overlay timer shared between the feed handler and readers.
///
/// Cloning is cheap and every clone drives the same two slots. Must be
/// triggered from inside a tokio runtime.
#[derive(Clone)]
pub struct OverlayTimer {
    inner: Arc<Mutex<OverlayInner>>,
    flash_lifetime: Duration,
    banner_lifetime: Duration,
}

impl OverlayTimer {
    pub fn new(flash_lifetime: Duration, banner_lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OverlayInner::default())),
            flash_lifetime,
            banner_lifetime,
        }
    }

    pub fn lifetime(&self, slot: OverlaySlot) -> Duration {
        match slot {
            OverlaySlot::PointFlash => self.flash_lifetime,
            OverlaySlot::Banner => self.banner_lifetime,
        }
    }

    /// Show `display` in its slot, replacing whatever is there.
    ///
    /// Returns the new token, or `None` once the timer is disposed.
    pub fn trigger(&self, display: OverlayDisplay) -> Option<u64> {
        let slot = display.slot();
        let lifetime = self.lifetime(slot);
        let mut inner = self.inner.lock();
        if inner.disposed {
            return None;
        }

        inner.next_token += 1;
        let token = inner.next_token;
        let expires_at = Instant::now() + lifetime;

        let state = inner.slot_mut(slot);
        state.cancel_timer();
        state.state = OverlayState::Showing {
            token,
            expires_at,
            display,
        };
        state.timer = Some(spawn_clear(Arc::downgrade(&self.inner), slot, token, expires_at));

        debug!("[Overlay] {:?} showing token {}", slot, token);
        Some(token)
    }

    /// Route a reducer signal to its slot
    pub fn show(&self, signal: Signal) -> Option<u64> {
        self.trigger(OverlayDisplay::from(signal))
    }

    pub fn state(&self, slot: OverlaySlot) -> OverlayState {
        self.inner.lock().slot(slot).state.clone()
    }

    /// Cancel both clear timers, go idle and ignore further triggers
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        inner.disposed = true;
        for slot in [OverlaySlot::PointFlash, OverlaySlot::Banner] {
            let state = inner.slot_mut(slot);
            state.cancel_timer();
            state.state = OverlayState::Idle;
        }
    }
}

fn spawn_clear(
    inner: Weak<Mutex<OverlayInner>>,
    slot: OverlaySlot,
    token: u64,
    expires_at: Instant,
) -> AbortHandle {
    tokio::spawn(async move {
        tokio::time::sleep_until(expires_at).await;
        if let Some(inner) = inner.upgrade() {
            if inner.lock().clear(slot, token) {
                debug!("[Overlay] {:?} cleared token {}", slot, token);
            }
        }
    })
    .abort_handle()
}
