use anyhow::Result;
use planebet_types::{Bet, BetKey, RoundPatch, RoundState, Team};
use std::future::Future;
use tokio::sync::broadcast;

#[cfg(any(test, feature = "mocks"))]
use anyhow::bail;
#[cfg(any(test, feature = "mocks"))]
use planebet_types::DEFAULT_FEED_BUFFER;
#[cfg(any(test, feature = "mocks"))]
use std::collections::BTreeMap;
#[cfg(any(test, feature = "mocks"))]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(any(test, feature = "mocks"))]
use tokio::sync::RwLock;

/// Change notification emitted after a successful write.
///
/// Notifications for a single document arrive in write order. Nothing is
/// guaranteed across documents.
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerChange {
    Round(RoundState),
    Team(Team),
    BetUpserted(Bet),
    BetDeleted(BetKey),
}

impl LedgerChange {
    /// Team the change belongs to, if any.
    pub fn team_name(&self) -> Option<&str> {
        match self {
            LedgerChange::Round(_) => None,
            LedgerChange::Team(team) => Some(team.team_name.as_str()),
            LedgerChange::BetUpserted(bet) => Some(bet.team_name.as_str()),
            LedgerChange::BetDeleted(key) => Some(key.team_name.as_str()),
        }
    }
}

/// Document store holding team balances, the round singleton and bets.
///
/// No operation is atomic with any other: multi-document sequences (such as
/// settlement) may be observed half-applied.
pub trait Ledger: Send + Sync + 'static {
    fn team(&self, name: &str) -> impl Future<Output = Result<Option<Team>>> + Send;
    /// All teams, in insertion order.
    fn teams(&self) -> impl Future<Output = Result<Vec<Team>>> + Send;
    /// Create or replace a team record.
    fn put_team(&self, team: Team) -> impl Future<Output = Result<()>> + Send;
    /// Update the cash field of an existing team. Fails if the team is missing.
    fn set_cash(&self, name: &str, cash: f64) -> impl Future<Output = Result<()>> + Send;

    fn round_state(&self) -> impl Future<Output = Result<RoundState>> + Send;
    /// Merge `patch` into the round singleton, creating it if needed.
    fn merge_round(&self, patch: RoundPatch) -> impl Future<Output = Result<RoundState>> + Send;

    fn bet(&self, key: &BetKey) -> impl Future<Output = Result<Option<Bet>>> + Send;
    /// Create or overwrite the bet stored under `bet.key()`.
    fn upsert_bet(&self, bet: Bet) -> impl Future<Output = Result<()>> + Send;
    fn bets_for_round(&self, round: u64) -> impl Future<Output = Result<Vec<Bet>>> + Send;
    /// Remove a bet. Returns `false` if nothing was stored under `key`.
    fn delete_bet(&self, key: &BetKey) -> impl Future<Output = Result<bool>> + Send;

    fn subscribe(&self) -> broadcast::Receiver<LedgerChange>;
}

#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
struct Documents {
    teams: Vec<Team>,
    round: RoundState,
    bets: BTreeMap<BetKey, Bet>,
}

/// In-memory ledger for tests.
#[cfg(any(test, feature = "mocks"))]
pub struct Memory {
    documents: RwLock<Documents>,
    changes: broadcast::Sender<LedgerChange>,
    write_budget: AtomicUsize,
}

#[cfg(any(test, feature = "mocks"))]
impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_BUFFER)
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Memory {
    pub fn new(feed_buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(feed_buffer.max(1));
        Self {
            documents: RwLock::new(Documents::default()),
            changes,
            write_budget: AtomicUsize::new(usize::MAX),
        }
    }

    /// Let the next `writes` writes succeed, then fail every write after.
    pub fn fail_writes_after(&self, writes: usize) {
        self.write_budget.store(writes, Ordering::SeqCst);
    }

    fn charge_write(&self) -> Result<()> {
        let remaining = self.write_budget.load(Ordering::SeqCst);
        if remaining == 0 {
            bail!("memory ledger: injected write failure");
        }
        if remaining != usize::MAX {
            self.write_budget.store(remaining - 1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn publish(&self, change: LedgerChange) {
        // No subscribers is not an error.
        let _ = self.changes.send(change);
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Ledger for Memory {
    async fn team(&self, name: &str) -> Result<Option<Team>> {
        let documents = self.documents.read().await;
        Ok(documents
            .teams
            .iter()
            .find(|team| team.team_name == name)
            .cloned())
    }

    async fn teams(&self) -> Result<Vec<Team>> {
        Ok(self.documents.read().await.teams.clone())
    }

    async fn put_team(&self, team: Team) -> Result<()> {
        self.charge_write()?;
        let mut documents = self.documents.write().await;
        match documents
            .teams
            .iter()
            .position(|stored| stored.team_name == team.team_name)
        {
            Some(index) => documents.teams[index] = team.clone(),
            None => documents.teams.push(team.clone()),
        }
        self.publish(LedgerChange::Team(team));
        Ok(())
    }

    async fn set_cash(&self, name: &str, cash: f64) -> Result<()> {
        self.charge_write()?;
        let mut documents = self.documents.write().await;
        let Some(team) = documents.teams.iter_mut().find(|team| team.team_name == name) else {
            bail!("memory ledger: no team named {name}");
        };
        team.cash = cash;
        let updated = team.clone();
        self.publish(LedgerChange::Team(updated));
        Ok(())
    }

    async fn round_state(&self) -> Result<RoundState> {
        Ok(self.documents.read().await.round)
    }

    async fn merge_round(&self, patch: RoundPatch) -> Result<RoundState> {
        self.charge_write()?;
        let mut documents = self.documents.write().await;
        documents.round.merge(patch);
        let state = documents.round;
        self.publish(LedgerChange::Round(state));
        Ok(state)
    }

    async fn bet(&self, key: &BetKey) -> Result<Option<Bet>> {
        Ok(self.documents.read().await.bets.get(key).cloned())
    }

    async fn upsert_bet(&self, bet: Bet) -> Result<()> {
        self.charge_write()?;
        let mut documents = self.documents.write().await;
        documents.bets.insert(bet.key(), bet.clone());
        self.publish(LedgerChange::BetUpserted(bet));
        Ok(())
    }

    async fn bets_for_round(&self, round: u64) -> Result<Vec<Bet>> {
        let documents = self.documents.read().await;
        Ok(documents
            .bets
            .values()
            .filter(|bet| bet.round == round)
            .cloned()
            .collect())
    }

    async fn delete_bet(&self, key: &BetKey) -> Result<bool> {
        self.charge_write()?;
        let mut documents = self.documents.write().await;
        let removed = documents.bets.remove(key).is_some();
        if removed {
            self.publish(LedgerChange::BetDeleted(key.clone()));
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.changes.subscribe()
    }
}
