//! Live feeds over ledger change notifications.
//!
//! Each feed subscribes to the ledger, loads an initial value, then reloads it
//! whenever a relevant change arrives and publishes the result on a
//! [watch] channel. The background task stops once every receiver is dropped
//! or the ledger stops publishing. A lagging subscription falls back to a
//! full reload.

use planebet_types::{RoundState, Team};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::leaderboard::{project, Standing};
use crate::session::bet_locked;
use crate::state::{Ledger, LedgerChange};

/// What a team's screen shows.
#[derive(Clone, Debug, PartialEq)]
pub struct TeamView {
    pub round: RoundState,
    /// Missing until the team's first login.
    pub team: Option<Team>,
    pub bet_locked: bool,
}

impl TeamView {
    pub fn cash(&self) -> f64 {
        self.team.as_ref().map(|team| team.cash).unwrap_or(0.0)
    }
}

async fn spawn_feed<L, T, R, F, Fut>(
    name: &'static str,
    ledger: Arc<L>,
    relevant: R,
    load: F,
) -> Result<watch::Receiver<T>>
where
    L: Ledger,
    T: Send + Sync + 'static,
    R: Fn(&LedgerChange) -> bool + Send + 'static,
    F: Fn(Arc<L>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send,
{
    // Subscribe before the first load so no change falls in between.
    let mut changes = ledger.subscribe();
    let initial = load(ledger.clone()).await?;
    let (sender, receiver) = watch::channel(initial);

    tokio::spawn(async move {
        loop {
            let reload = tokio::select! {
                _ = sender.closed() => break,
                change = changes.recv() => match change {
                    Ok(change) => relevant(&change),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(feed = name, skipped, "feed lagged; reloading");
                        true
                    }
                    Err(RecvError::Closed) => break,
                },
            };
            if !reload {
                continue;
            }
            match load(ledger.clone()).await {
                Ok(value) => {
                    sender.send_replace(value);
                }
                Err(err) => warn!(feed = name, %err, "feed reload failed"),
            }
        }
        debug!(feed = name, "feed stopped");
    });

    Ok(receiver)
}

/// Current round state, updated on every round change.
pub async fn watch_round<L: Ledger>(ledger: Arc<L>) -> Result<watch::Receiver<RoundState>> {
    spawn_feed(
        "round",
        ledger,
        |change| matches!(change, LedgerChange::Round(_)),
        |ledger: Arc<L>| async move { ledger.round_state().await.map_err(Error::from) },
    )
    .await
}

/// Cash, round and bet lock for one team.
pub async fn watch_team<L: Ledger>(
    ledger: Arc<L>,
    team_name: &str,
) -> Result<watch::Receiver<TeamView>> {
    let filter_name = team_name.to_string();
    let load_name = team_name.to_string();
    spawn_feed(
        "team",
        ledger,
        move |change| match change {
            LedgerChange::Round(_) => true,
            other => other.team_name() == Some(filter_name.as_str()),
        },
        move |ledger: Arc<L>| {
            let team_name = load_name.clone();
            async move { team_view(&*ledger, &team_name).await }
        },
    )
    .await
}

/// Leaderboard, recomputed whenever any team changes.
pub async fn watch_leaderboard<L: Ledger>(
    ledger: Arc<L>,
) -> Result<watch::Receiver<Vec<Standing>>> {
    spawn_feed(
        "leaderboard",
        ledger,
        |change| matches!(change, LedgerChange::Team(_)),
        |ledger: Arc<L>| async move {
            let teams = ledger.teams().await?;
            Ok::<_, Error>(project(&teams))
        },
    )
    .await
}

async fn team_view<L: Ledger>(ledger: &L, team_name: &str) -> Result<TeamView> {
    let round = ledger.round_state().await?;
    let team = ledger.team(team_name).await?;
    let bet_locked = bet_locked(ledger, team_name, round.round).await?;
    Ok(TeamView {
        round,
        team,
        bet_locked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{place, seed_team};
    use crate::round::RoundController;
    use crate::state::Memory;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn wait_for<T: Clone>(
        receiver: &mut watch::Receiver<T>,
        mut done: impl FnMut(&T) -> bool,
    ) -> T {
        timeout(Duration::from_secs(5), async {
            loop {
                let value = receiver.borrow_and_update().clone();
                if done(&value) {
                    return value;
                }
                receiver.changed().await.expect("feed closed");
            }
        })
        .await
        .expect("feed did not update in time")
    }

    #[tokio::test]
    async fn round_feed_follows_controller() {
        let ledger = Arc::new(Memory::default());
        let mut round = watch_round(ledger.clone()).await.unwrap();
        assert_eq!(*round.borrow(), RoundState::inactive(0));

        let mut rounds = RoundController::load(ledger.clone()).await.unwrap();
        rounds.start().await.unwrap();
        wait_for(&mut round, |state| *state == RoundState::active(1)).await;

        rounds.stop().await.unwrap();
        wait_for(&mut round, |state| *state == RoundState::inactive(1)).await;
    }

    #[tokio::test]
    async fn team_feed_tracks_cash_and_lock() {
        let ledger = Arc::new(Memory::default());
        seed_team(&ledger, "A", 1_000.0).await;
        seed_team(&ledger, "B", 1_000.0).await;
        let mut view = watch_team(ledger.clone(), "A").await.unwrap();
        assert_eq!(view.borrow().cash(), 1_000.0);
        assert!(!view.borrow().bet_locked);

        let mut rounds = RoundController::load(ledger.clone()).await.unwrap();
        rounds.start().await.unwrap();
        place(&ledger, 1, "A", "1", 100.0).await;
        place(&ledger, 1, "B", "2", 300.0).await;
        wait_for(&mut view, |v| v.bet_locked).await;

        rounds.settle(Some("1")).await.unwrap();
        let settled = wait_for(&mut view, |v| !v.round.active && !v.bet_locked).await;
        assert_eq!(settled.round, RoundState::inactive(1));
        assert_eq!(settled.cash(), 1_300.0);
    }

    #[tokio::test]
    async fn leaderboard_feed_reranks() {
        let ledger = Arc::new(Memory::default());
        seed_team(&ledger, "A", 1_000.0).await;
        seed_team(&ledger, "B", 900.0).await;
        let mut board = watch_leaderboard(ledger.clone()).await.unwrap();
        assert_eq!(board.borrow()[0].team_name, "A");

        ledger.set_cash("B", 5_000.0).await.unwrap();
        let board = wait_for(&mut board, |b| b[0].team_name == "B").await;
        assert_eq!(board[1].team_name, "A");
        assert_eq!(board[1].rank, 2);
    }

    #[tokio::test]
    async fn lagged_feed_reloads() {
        let ledger = Arc::new(Memory::new(1));
        seed_team(&ledger, "A", 1.0).await;
        let mut board = watch_leaderboard(ledger.clone()).await.unwrap();
        for cash in 2..50 {
            ledger.set_cash("A", cash as f64).await.unwrap();
        }
        wait_for(&mut board, |b| b[0].cash == 49.0).await;
    }
}
