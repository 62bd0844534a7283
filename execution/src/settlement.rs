//! Round settlement (checkout) arithmetic.
//!
//! Losers' pooled stake is shared among winners pro-rata by their own stake:
//!
//! ```text
//! credit(w) = stake(w) / total_winner_stake * total_loser_stake
//! ```
//!
//! Every loser is debited its stake whenever losers exist. Winners are only
//! credited when there is at least one winner and both sides staked a
//! positive total; otherwise the round pays nobody and losers still pay.
//! With winners and losers on both sides, debits and credits cancel (up to
//! floating-point rounding).
//!
//! [SettlementPlan] only computes; applying it to a ledger is the job of
//! [crate::RoundController::settle].

use planebet_types::Bet;

/// Balance change for one team.
#[derive(Clone, Debug, PartialEq)]
pub struct Transfer {
    pub team_name: String,
    /// Negative for debits.
    pub delta: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SettlementPlan {
    pub round: u64,
    pub winning_plane: String,
    pub winners: Vec<Bet>,
    pub losers: Vec<Bet>,
    pub total_winner_stake: f64,
    pub total_loser_stake: f64,
    pub debits: Vec<Transfer>,
    pub credits: Vec<Transfer>,
}

impl SettlementPlan {
    /// Partition `bets` against `winning_plane` and compute transfers.
    pub fn new(round: u64, bets: Vec<Bet>, winning_plane: &str) -> Self {
        let winning_plane = winning_plane.trim().to_string();
        let (winners, losers): (Vec<Bet>, Vec<Bet>) =
            bets.into_iter().partition(|bet| bet.picked(&winning_plane));

        let total_winner_stake: f64 = winners.iter().map(|bet| bet.amount).sum();
        let total_loser_stake: f64 = losers.iter().map(|bet| bet.amount).sum();

        let debits = losers
            .iter()
            .map(|bet| Transfer {
                team_name: bet.team_name.clone(),
                delta: -bet.amount,
            })
            .collect();

        let pays_winners =
            !winners.is_empty() && total_winner_stake > 0.0 && total_loser_stake > 0.0;
        let credits = if pays_winners {
            winners
                .iter()
                .map(|bet| Transfer {
                    team_name: bet.team_name.clone(),
                    delta: bet.amount / total_winner_stake * total_loser_stake,
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            round,
            winning_plane,
            winners,
            losers,
            total_winner_stake,
            total_loser_stake,
            debits,
            credits,
        }
    }

    pub fn pays_winners(&self) -> bool {
        !self.credits.is_empty()
    }

    /// Debits first, then credits: the order they are applied in.
    pub fn transfers(&self) -> impl Iterator<Item = &Transfer> {
        self.debits.iter().chain(self.credits.iter())
    }

    /// Sum of all balance changes. Zero when winners are paid.
    pub fn net_change(&self) -> f64 {
        self.transfers().map(|transfer| transfer.delta).sum()
    }

    /// Total delta planned for `team_name`.
    pub fn delta_for(&self, team_name: &str) -> f64 {
        self.transfers()
            .filter(|transfer| transfer.team_name == team_name)
            .map(|transfer| transfer.delta)
            .sum()
    }
}
