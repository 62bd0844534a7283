//! Full event flows: teams log in, bet and get settled by the admin.

#[cfg(test)]
mod tests {
    use crate::mocks::MemorySessionCache;
    use crate::{
        project, query_round_book, BetRejection, Ledger, Memory, RoundController, Settlement,
        TeamSession,
    };
    use planebet_types::{GameConfig, RoundState, SessionRecord};
    use std::sync::Arc;

    fn credentials(team: &str) -> SessionRecord {
        SessionRecord {
            team_name: team.to_string(),
            rolls: format!("{team}-01"),
            institute_email: format!("{}@iitp.ac.in", team.to_lowercase()),
        }
    }

    async fn join(ledger: &Arc<Memory>, team: &str) -> TeamSession<Memory> {
        let cache = MemorySessionCache::default();
        TeamSession::login(ledger.clone(), &cache, &GameConfig::default(), credentials(team))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn lone_winner_keeps_stake() {
        let ledger = Arc::new(Memory::default());
        let mut rounds = RoundController::load(ledger.clone()).await.unwrap();
        let falcons = join(&ledger, "Falcons").await;
        assert_eq!(falcons.cash().await.unwrap(), 10_000.0);

        rounds.start().await.unwrap();
        falcons.place_bet("3", 500.0).await.unwrap();
        assert!(falcons.bet_locked().await.unwrap());

        let Settlement::Settled(report) = rounds.settle(Some("3")).await.unwrap() else {
            panic!("expected settlement");
        };
        assert!(!report.plan.pays_winners());
        assert_eq!(falcons.cash().await.unwrap(), 10_000.0);
        assert_eq!(rounds.state(), RoundState::inactive(1));
        assert!(ledger.bets_for_round(1).await.unwrap().is_empty());
        assert!(!falcons.bet_locked().await.unwrap());
    }

    #[tokio::test]
    async fn several_rounds_keep_balances_non_negative() {
        let ledger = Arc::new(Memory::default());
        let mut rounds = RoundController::load(ledger.clone()).await.unwrap();
        let hawks = join(&ledger, "Hawks").await;
        let owls = join(&ledger, "Owls").await;
        let kites = join(&ledger, "Kites").await;

        for (round, winner) in [(1u64, "1"), (2, "2"), (3, "9")] {
            rounds.start().await.unwrap();
            // Everyone goes all in.
            for (session, plane) in [(&hawks, "1"), (&owls, "2"), (&kites, "2")] {
                let cash = session.cash().await.unwrap();
                if cash > 0.0 {
                    session.place_bet(plane, cash).await.unwrap();
                }
            }
            let book = query_round_book(&*ledger).await.unwrap();
            assert_eq!(book.state, RoundState::active(round));
            rounds.settle(Some(winner)).await.unwrap();

            let teams = ledger.teams().await.unwrap();
            assert!(teams.iter().all(|team| team.cash >= 0.0));
        }

        // Broke teams cannot bet.
        rounds.start().await.unwrap();
        let err = hawks.place_bet("1", 1.0).await.unwrap_err();
        assert_eq!(err.rejection(), Some(BetRejection::InsufficientFunds));

        let board = project(&ledger.teams().await.unwrap());
        assert_eq!(board.len(), 3);
        assert!(board.iter().all(|standing| standing.cash == 0.0));
    }
}
