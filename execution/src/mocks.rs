//! Helpers for seeding an in-memory ledger in tests.

use anyhow::{anyhow, Result};
use planebet_types::{Bet, SessionRecord, Team};
use std::sync::Mutex;

use crate::session::SessionCache;
use crate::state::{Ledger, Memory};

/// Insert (or replace) a team with the given cash.
pub async fn seed_team(ledger: &Memory, name: &str, cash: f64) -> Team {
    let team = Team::new(name, format!("{name}-rolls"), format!("{name}@event.test"), cash, 0);
    ledger
        .put_team(team.clone())
        .await
        .expect("seed team");
    team
}

/// Write a bet directly, bypassing validation.
pub async fn place(ledger: &Memory, round: u64, team: &str, plane: &str, amount: f64) -> Bet {
    let bet = Bet {
        round,
        team_name: team.to_string(),
        plane: plane.to_string(),
        amount,
        ts: 0,
    };
    ledger.upsert_bet(bet.clone()).await.expect("place bet");
    bet
}

/// Session cache kept in memory.
#[derive(Default)]
pub struct MemorySessionCache {
    record: Mutex<Option<SessionRecord>>,
}

impl SessionCache for MemorySessionCache {
    fn load(&self) -> Result<Option<SessionRecord>> {
        let record = self
            .record
            .lock()
            .map_err(|_| anyhow!("session cache poisoned"))?;
        Ok(record.clone())
    }

    fn store(&self, record: &SessionRecord) -> Result<()> {
        *self
            .record
            .lock()
            .map_err(|_| anyhow!("session cache poisoned"))? = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .record
            .lock()
            .map_err(|_| anyhow!("session cache poisoned"))? = None;
        Ok(())
    }
}
