//! Round lifecycle controller.
//!
//! ## States
//!
//! `INACTIVE(n)` and `ACTIVE(n)`, starting at `INACTIVE(0)`:
//! - `start()` from anywhere: `n += 1`, becomes `ACTIVE(n)`.
//! - `stop()` from `ACTIVE(n)`: becomes `INACTIVE(n)`, bets are kept.
//! - `settle(label)` from anywhere with `n > 0`: resolves the round's bets and
//!   ends in `INACTIVE(n)`.
//!
//! The controller owns its [RoundState] explicitly and mirrors every change
//! to the ledger singleton. Other administrators may write the same document;
//! every operation re-reads it first and the last write wins.
//!
//! ## Partial settlement
//!
//! Settlement is a sequence of independent writes (debits, credits, bet
//! deletions, deactivation). A store failure stops the sequence and is
//! returned as [Error::StoreUnavailable]; writes already made stay applied.

use planebet_types::{Bet, RoundPatch, RoundState};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::settlement::{SettlementPlan, Transfer};
use crate::state::Ledger;

/// What `settle` did.
#[derive(Clone, Debug, PartialEq)]
pub enum Settlement {
    /// No bets were placed; the round was deactivated without moving money.
    NoBets { round: u64 },
    /// No winning plane was given; nothing was written.
    Aborted { round: u64 },
    Settled(SettlementReport),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SettlementReport {
    pub plan: SettlementPlan,
    /// Teams whose transfers were skipped because their record is missing.
    pub skipped: Vec<String>,
    /// Number of bet records removed by this settlement.
    pub cleared: usize,
}

pub struct RoundController<L: Ledger> {
    ledger: Arc<L>,
    state: RoundState,
}

impl<L: Ledger> RoundController<L> {
    /// Build a controller from the round state currently stored.
    pub async fn load(ledger: Arc<L>) -> Result<Self> {
        let state = ledger.round_state().await?;
        Ok(Self { ledger, state })
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Reload the round state from the ledger.
    pub async fn refresh(&mut self) -> Result<RoundState> {
        self.state = self.ledger.round_state().await?;
        Ok(self.state)
    }

    /// Open the next round.
    pub async fn start(&mut self) -> Result<RoundState> {
        let current = self.refresh().await?;
        let next = current.round.saturating_add(1);
        self.state = self.ledger.merge_round(RoundPatch::start(next)).await?;
        info!(round = next, "round started");
        Ok(self.state)
    }

    /// Pause betting without settling. Returns `false` if no round was active.
    pub async fn stop(&mut self) -> Result<bool> {
        let current = self.refresh().await?;
        if !current.active {
            debug!(round = current.round, "stop ignored: round not active");
            return Ok(false);
        }
        self.state = self.ledger.merge_round(RoundPatch::deactivate()).await?;
        info!(round = self.state.round, "round stopped");
        Ok(true)
    }

    /// Resolve the current round against `winning_plane`.
    ///
    /// Bets are fetched before the label is looked at: a round without bets
    /// is closed even when no label is given. A missing or blank label with
    /// bets present aborts before any write.
    pub async fn settle(&mut self, winning_plane: Option<&str>) -> Result<Settlement> {
        let current = self.refresh().await?;
        if !current.has_started() {
            return Err(Error::NoActiveRound);
        }
        let round = current.round;

        let bets = self.ledger.bets_for_round(round).await?;
        if bets.is_empty() {
            self.deactivate().await?;
            info!(round, "round closed with no bets");
            return Ok(Settlement::NoBets { round });
        }

        let Some(winning_plane) = winning_plane.filter(|label| !label.trim().is_empty()) else {
            info!(round, bets = bets.len(), "settlement aborted: no winning plane");
            return Ok(Settlement::Aborted { round });
        };

        let plan = SettlementPlan::new(round, bets, winning_plane);
        let mut skipped = Vec::new();
        for transfer in plan.transfers() {
            if !self.apply_transfer(transfer).await? {
                skipped.push(transfer.team_name.clone());
            }
        }

        let cleared = self.clear_bets(plan.winners.iter().chain(plan.losers.iter())).await?;
        self.deactivate().await?;

        info!(
            round,
            winning_plane = %plan.winning_plane,
            winners = plan.winners.len(),
            losers = plan.losers.len(),
            total_winner_stake = plan.total_winner_stake,
            total_loser_stake = plan.total_loser_stake,
            paid = plan.pays_winners(),
            "round settled"
        );
        Ok(Settlement::Settled(SettlementReport {
            plan,
            skipped,
            cleared,
        }))
    }

    /// Read-modify-write one balance. Returns `false` if the team is missing.
    async fn apply_transfer(&self, transfer: &Transfer) -> Result<bool> {
        let Some(team) = self.ledger.team(&transfer.team_name).await? else {
            warn!(team = %transfer.team_name, delta = transfer.delta, "skipping transfer: team not found");
            return Ok(false);
        };
        let cash = team.cash + transfer.delta;
        self.ledger.set_cash(&team.team_name, cash).await?;
        debug!(team = %team.team_name, delta = transfer.delta, cash, "balance updated");
        Ok(true)
    }

    /// Delete `bets`, counting only records this call actually removed.
    async fn clear_bets<'a>(&self, bets: impl Iterator<Item = &'a Bet>) -> Result<usize> {
        let mut cleared = 0;
        for bet in bets {
            if self.ledger.delete_bet(&bet.key()).await? {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn deactivate(&mut self) -> Result<()> {
        self.state = self.ledger.merge_round(RoundPatch::deactivate()).await?;
        Ok(())
    }
}
