//! Planebet round and settlement core.
//!
//! Teams hold a cash balance, place at most one bet per round on a plane, and
//! an administrator settles each round by naming the winning plane. All state
//! lives behind the [Ledger] trait; this crate never talks to a concrete
//! store.
//!
//! The primary entrypoints are [RoundController] for the administrator and
//! [TeamSession] for teams. Live views are built with [watch_round],
//! [watch_team] and [watch_leaderboard].
//!
//! ## Example
//! ```rust,ignore
//! use planebet_execution::{Memory, RoundController, Settlement};
//! use std::sync::Arc;
//!
//! # async fn example() -> planebet_execution::Result<()> {
//! let ledger = Arc::new(Memory::default());
//! let mut rounds = RoundController::load(ledger.clone()).await?;
//! rounds.start().await?;
//! // Teams place bets through `TeamSession::place_bet`.
//! match rounds.settle(Some("3")).await? {
//!     Settlement::Settled(report) => println!("moved {:?}", report.plan.transfers()),
//!     other => println!("{other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod feed;
mod leaderboard;
mod round;
mod round_query;
mod session;
mod settlement;
mod state;
mod validator;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod scenario_tests;

pub use error::{Error, Result};
pub use feed::{watch_leaderboard, watch_round, watch_team, TeamView};
pub use leaderboard::{project, Standing};
pub use round::{RoundController, Settlement, SettlementReport};
pub use round_query::{plane_totals, query_round_book, round_bets, PlaneTotal, RoundBook};
pub use session::{bet_locked, FileSessionCache, SessionCache, TeamSession};
pub use settlement::{SettlementPlan, Transfer};
pub use state::{Ledger, LedgerChange};
pub use validator::{validate, BetRejection};

#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
