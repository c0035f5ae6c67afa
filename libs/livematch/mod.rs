//! Live Match Feed Client
//!
//! Keeps a reconnecting feed of ping-pong match events, folds it into live
//! match state, drives scoreboard overlays and polls slow reference data
//! (rankings, recent results, sponsors) next to it.

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used items
pub use application::{
    reduce, FeedSession, LiveState, OverlayDisplay, OverlaySlot, OverlayState, OverlayTimer,
    PollSettings, PollSynchronizer, Reduction, SessionError,
};
pub use domain::{
    ClientRole, DecodeError, FeedMessage, Match, MatchId, MatchStatus, ReferenceData, Side,
    Signal, SpecialEvent, SpecialEventKind, SponsorRotation, SponsorSet,
};
pub use infrastructure::{
    init_tracing, ConfigError, FeedConfig, ReferenceApiError, ReferenceSource,
    RestReferenceClient, ShutdownManager,
};
