//! Leaderboard projection.
//!
//! Ranks are derived from team balances on every read and never persisted.

use planebet_types::Team;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// 1-based.
    pub rank: usize,
    pub team_name: String,
    pub cash: f64,
}

impl Standing {
    /// Cash rounded to whole units, as shown on the board.
    pub fn display_cash(&self) -> i64 {
        self.cash.round() as i64
    }
}

/// Rank teams by cash, highest first. Ties keep the order of `teams`.
pub fn project(teams: &[Team]) -> Vec<Standing> {
    let mut ordered: Vec<&Team> = teams.iter().collect();
    ordered.sort_by(|a, b| b.cash.total_cmp(&a.cash));
    ordered
        .into_iter()
        .enumerate()
        .map(|(index, team)| Standing {
            rank: index + 1,
            team_name: team.team_name.clone(),
            cash: team.cash,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn team(name: &str, cash: f64) -> Team {
        Team::new(name, "", "", cash, 0)
    }

    #[test]
    fn orders_by_cash_descending() {
        let teams = [team("A", 9_500.0), team("B", 12_000.0), team("C", 10_000.0)];
        let board = project(&teams);
        let names: Vec<_> = board.iter().map(|s| s.team_name.as_str()).collect();
        assert_eq!(names, ["B", "C", "A"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[2].rank, 3);
    }

    #[test]
    fn ties_keep_read_order() {
        let teams = [team("Owls", 10.0), team("Hawks", 20.0), team("Falcons", 10.0)];
        let board = project(&teams);
        let names: Vec<_> = board.iter().map(|s| s.team_name.as_str()).collect();
        assert_eq!(names, ["Hawks", "Owls", "Falcons"]);
    }

    #[test]
    fn empty_board() {
        assert!(project(&[]).is_empty());
    }

    #[test]
    fn display_rounds_to_nearest() {
        let board = project(&[team("A", 10_083.33), team("B", 99.5)]);
        assert_eq!(board[0].display_cash(), 10_083);
        assert_eq!(board[1].display_cash(), 100);
    }

    proptest! {
        #[test]
        fn projection_is_repeatable(cash in prop::collection::vec(0.0f64..50_000.0, 0..30)) {
            let teams: Vec<Team> = cash
                .iter()
                .enumerate()
                .map(|(i, c)| team(&format!("T{i}"), *c))
                .collect();
            let first = project(&teams);
            let second = project(&teams);
            prop_assert_eq!(&first, &second);
            for pair in first.windows(2) {
                prop_assert!(pair[0].cash >= pair[1].cash);
            }
        }
    }
}
