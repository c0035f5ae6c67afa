//! Lock-free connection state shared between the client task and its owner.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Lifecycle of the logical channel.
///
/// `Connecting → Open → Closed → Connecting → …` until an explicit shutdown
/// moves it to `ShutDown`, the only terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closed = 2,
    ShutDown = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            3 => ConnectionState::ShutDown,
            _ => ConnectionState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::ShutDown => "shut_down",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection state plus the reconnect-attempt counter.
#[derive(Debug)]
pub struct AtomicConnectionState {
    state: AtomicU8,
    attempts: AtomicUsize,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
            attempts: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Set a new state. `ShutDown` is sticky.
    #[inline]
    pub fn set(&self, state: ConnectionState) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current == ConnectionState::ShutDown as u8 {
                    None
                } else {
                    Some(state as u8)
                }
            });
    }

    /// Mark the channel open and reset the attempt counter
    pub fn record_open(&self) {
        self.attempts.store(0, Ordering::Release);
        self.set(ConnectionState::Open);
    }

    pub fn set_reconnect_attempts(&self, attempts: usize) {
        self.attempts.store(attempts, Ordering::Release);
    }

    #[inline]
    pub fn reconnect_attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ConnectionState::Open
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.get() == ConnectionState::Connecting
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.get() == ConnectionState::Closed
    }

    #[inline]
    pub fn is_shut_down(&self) -> bool {
        self.get() == ConnectionState::ShutDown
    }
}

/// Traffic counters
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}
