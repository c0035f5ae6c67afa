//! Application Layer
//!
//! Reducer, overlay timer, poll synchronizer and the session that owns them.
//! This layer depends on the domain and infrastructure layers.

pub mod overlay;
pub mod poller;
pub mod reducer;
pub mod session;

pub use overlay::{OverlayDisplay, OverlaySlot, OverlayState, OverlayTimer};
pub use poller::{PollSettings, PollSynchronizer};
pub use reducer::{reduce, LiveState, Reduction};
pub use session::{FeedSession, SessionError};
