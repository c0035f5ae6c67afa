//! Domain Layer
//!
//! Wire messages, match records, derived signals and reference data.
//! No I/O and no timers live here.

pub mod messages;
pub mod models;
pub mod reference;
pub mod special_event;

pub use messages::{decode, DecodeError, FeedMessage, Point, PointScored, Situation, SituationKind};
pub use models::{ClientRole, Match, MatchId, MatchStatus, PlayerRef, SetScore, Side, DEFAULT_BEST_OF};
pub use reference::{ReferenceData, SponsorRotation, SponsorSet};
pub use special_event::{Signal, SpecialEvent, SpecialEventKind};
