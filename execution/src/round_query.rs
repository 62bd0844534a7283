//! Admin-side round queries: the bets of the current round and stake totals
//! per plane.

use planebet_types::{Bet, RoundState};
use serde::Serialize;

use crate::error::Result;
use crate::state::Ledger;

/// Stake placed on one plane.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaneTotal {
    pub plane: String,
    pub amount: f64,
}

/// Snapshot of the round as the admin sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundBook {
    pub state: RoundState,
    pub bets: Vec<Bet>,
    pub totals: Vec<PlaneTotal>,
}

impl RoundBook {
    pub fn total_staked(&self) -> f64 {
        self.totals.iter().map(|total| total.amount).sum()
    }
}

/// Bets of `round`. Round 0 never has bets.
pub async fn round_bets<L: Ledger>(ledger: &L, round: u64) -> Result<Vec<Bet>> {
    if round == 0 {
        return Ok(Vec::new());
    }
    Ok(ledger.bets_for_round(round).await?)
}

/// Sum stakes per plane, largest first. Equal totals keep first-seen order.
pub fn plane_totals(bets: &[Bet]) -> Vec<PlaneTotal> {
    let mut totals: Vec<PlaneTotal> = Vec::new();
    for bet in bets {
        match totals.iter_mut().find(|total| total.plane == bet.plane) {
            Some(total) => total.amount += bet.amount,
            None => totals.push(PlaneTotal {
                plane: bet.plane.clone(),
                amount: bet.amount,
            }),
        }
    }
    totals.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    totals
}

/// Read the current round and its bets.
pub async fn query_round_book<L: Ledger>(ledger: &L) -> Result<RoundBook> {
    let state = ledger.round_state().await?;
    let bets = round_bets(ledger, state.round).await?;
    let totals = plane_totals(&bets);
    Ok(RoundBook {
        state,
        bets,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::place;
    use crate::state::Memory;
    use planebet_types::RoundPatch;

    fn bet(team: &str, plane: &str, amount: f64) -> Bet {
        Bet {
            round: 1,
            team_name: team.to_string(),
            plane: plane.to_string(),
            amount,
            ts: 0,
        }
    }

    #[test]
    fn totals_group_and_sort() {
        let bets = [
            bet("A", "3", 100.0),
            bet("B", "7", 500.0),
            bet("C", "3", 450.0),
            bet("D", "1", 500.0),
        ];
        let totals = plane_totals(&bets);
        assert_eq!(
            totals,
            [
                PlaneTotal { plane: "3".to_string(), amount: 550.0 },
                PlaneTotal { plane: "7".to_string(), amount: 500.0 },
                PlaneTotal { plane: "1".to_string(), amount: 500.0 },
            ]
        );
    }

    #[tokio::test]
    async fn round_zero_has_no_bets() {
        let ledger = Memory::default();
        place(&ledger, 0, "A", "1", 1.0).await;
        assert!(round_bets(&ledger, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn book_reads_current_round() {
        let ledger = Memory::default();
        ledger.merge_round(RoundPatch::start(2)).await.unwrap();
        place(&ledger, 1, "A", "1", 99.0).await;
        place(&ledger, 2, "A", "4", 10.0).await;
        place(&ledger, 2, "B", "4", 15.0).await;

        let book = query_round_book(&ledger).await.unwrap();
        assert_eq!(book.state, RoundState::active(2));
        assert_eq!(book.bets.len(), 2);
        assert_eq!(book.totals.len(), 1);
        assert_eq!(book.total_staked(), 25.0);
    }
}
