//! Common types used throughout planebet.
//!
//! Everything persisted in the ledger lives here: team balance records, the
//! round/event singleton, bet records and the client-side session record.
//! Field names serialize in camelCase so documents match what the event
//! frontend reads and writes.

pub mod config;
pub mod constants;
pub mod ledger;

pub use config::{ConfigError, GameConfig};
pub use constants::{DEFAULT_FEED_BUFFER, EVENT_ID, INITIAL_CASH};
pub use ledger::{Bet, BetKey, RoundPatch, RoundState, SessionRecord, Team};
