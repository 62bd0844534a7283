//! Team-facing commands: login, bet placement and the bet lock.
//!
//! A successful login writes a [SessionRecord] to a [SessionCache] so the
//! team can be restored on the next start without logging in again. Cached
//! sessions never expire; [TeamSession::logout] removes them.

use anyhow::Context;
use planebet_types::{Bet, BetKey, GameConfig, SessionRecord, Team};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::state::Ledger;
use crate::validator::validate;
use crate::now_ms;

/// Client-local store for the logged-in team.
pub trait SessionCache: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<SessionRecord>>;
    fn store(&self, record: &SessionRecord) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Session cache backed by a JSON file.
pub struct FileSessionCache {
    path: PathBuf,
}

impl FileSessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionCache for FileSessionCache {
    fn load(&self) -> anyhow::Result<Option<SessionRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read session cache {}", self.path.display()))?;
        let record = serde_json::from_str(&raw).context("decode session cache")?;
        Ok(Some(record))
    }

    fn store(&self, record: &SessionRecord) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("create session cache directory")?;
            }
        }
        let raw = serde_json::to_string(record).context("encode session cache")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("write session cache {}", self.path.display()))
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("remove session cache"),
        }
    }
}

/// A logged-in team.
pub struct TeamSession<L: Ledger> {
    ledger: Arc<L>,
    record: SessionRecord,
}

impl<L: Ledger> TeamSession<L> {
    /// Log a team in, creating its record on first login.
    ///
    /// Existing teams keep their cash and any profile fields already stored;
    /// blank stored fields are filled from the form.
    pub async fn login<C: SessionCache>(
        ledger: Arc<L>,
        cache: &C,
        config: &GameConfig,
        credentials: SessionRecord,
    ) -> Result<Self> {
        let record = SessionRecord {
            team_name: credentials.team_name.trim().to_string(),
            rolls: credentials.rolls.trim().to_string(),
            institute_email: credentials.institute_email.trim().to_string(),
        };
        if record.team_name.is_empty() || record.rolls.is_empty() || record.institute_email.is_empty()
        {
            return Err(Error::MissingCredentials);
        }

        match ledger.team(&record.team_name).await? {
            None => {
                let team = Team::new(
                    record.team_name.clone(),
                    record.rolls.clone(),
                    record.institute_email.clone(),
                    config.initial_cash,
                    now_ms(),
                );
                ledger.put_team(team).await?;
                info!(team = %record.team_name, cash = config.initial_cash, "team registered");
            }
            Some(mut team) => {
                if team.fill_profile(&record.rolls, &record.institute_email) {
                    ledger.put_team(team).await?;
                }
                info!(team = %record.team_name, "team logged in");
            }
        }

        cache.store(&record)?;
        Ok(Self { ledger, record })
    }

    /// Resume the cached session, if any.
    pub fn restore<C: SessionCache>(ledger: Arc<L>, cache: &C) -> Result<Option<Self>> {
        Ok(cache.load()?.map(|record| Self { ledger, record }))
    }

    pub fn logout<C: SessionCache>(self, cache: &C) -> Result<()> {
        cache.clear()?;
        Ok(())
    }

    pub fn team_name(&self) -> &str {
        &self.record.team_name
    }

    /// Current cash; zero if the team record is missing.
    pub async fn cash(&self) -> Result<f64> {
        Ok(self
            .ledger
            .team(&self.record.team_name)
            .await?
            .map(|team| team.cash)
            .unwrap_or(0.0))
    }

    /// Whether this team already has a bet in the current round.
    pub async fn bet_locked(&self) -> Result<bool> {
        let round = self.ledger.round_state().await?;
        bet_locked(&*self.ledger, &self.record.team_name, round.round).await
    }

    /// Validate and upsert a bet for the current round.
    ///
    /// Resubmitting in the same round replaces the earlier bet.
    pub async fn place_bet(&self, plane: &str, amount: f64) -> Result<Bet> {
        let round = self.ledger.round_state().await?;
        let cash = self.cash().await?;
        if let Err(reason) = validate(Some(self.record.team_name.as_str()), &round, plane, amount, cash) {
            warn!(team = %self.record.team_name, round = round.round, plane, amount, %reason, "bet rejected");
            return Err(reason.into());
        }

        let bet = Bet {
            round: round.round,
            team_name: self.record.team_name.clone(),
            plane: plane.trim().to_string(),
            amount,
            ts: now_ms(),
        };
        self.ledger.upsert_bet(bet.clone()).await?;
        info!(team = %bet.team_name, round = bet.round, plane = %bet.plane, amount, "bet placed");
        Ok(bet)
    }
}

/// Whether `team_name` has a bet recorded for `round`. Round 0 never locks.
pub async fn bet_locked<L: Ledger>(ledger: &L, team_name: &str, round: u64) -> Result<bool> {
    if round == 0 {
        return Ok(false);
    }
    Ok(ledger.bet(&BetKey::new(round, team_name)).await?.is_some())
}
