//! SQLite implementation of [Ledger].
//!
//! Documents are stored as JSON next to the columns they are looked up by.
//! Every operation is its own statement; nothing spans a transaction, so a
//! settlement interrupted halfway stays half-applied here too.

use anyhow::{anyhow, bail, Context, Result};
use planebet_execution::{Ledger, LedgerChange};
use planebet_types::{Bet, BetKey, GameConfig, RoundPatch, RoundState, Team};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
    event_id: Arc<str>,
    changes: broadcast::Sender<LedgerChange>,
}

impl SqliteLedger {
    pub fn open(path: &Path, config: &GameConfig) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open ledger db {}", path.display()))?;
        init_schema_sqlite(&conn)?;
        let (changes, _) = broadcast::channel(config.feed_buffer.max(1));
        debug!(path = %path.display(), event = %config.event_id, "ledger opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            event_id: Arc::from(config.event_id.as_str()),
            changes,
        })
    }

    /// Run `op` against the connection on a blocking thread.
    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &broadcast::Sender<LedgerChange>) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let changes = self.changes.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| anyhow!("ledger connection poisoned"))?;
            op(&conn, &changes)
        })
        .await
        .context("ledger task failed")?
    }
}

fn init_schema_sqlite(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         CREATE TABLE IF NOT EXISTS teams (
             team_name TEXT PRIMARY KEY,
             doc TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS events (
             event_id TEXT PRIMARY KEY,
             active INTEGER NOT NULL,
             round INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS bets (
             bet_id TEXT PRIMARY KEY,
             round INTEGER NOT NULL,
             team_name TEXT NOT NULL,
             doc TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS bets_by_round ON bets (round);",
    )
    .context("init ledger schema")?;
    Ok(())
}

fn load_team(conn: &Connection, name: &str) -> Result<Option<Team>> {
    let doc: Option<String> = conn
        .query_row(
            "SELECT doc FROM teams WHERE team_name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()
        .context("read team")?;
    doc.map(|doc| serde_json::from_str(&doc).context("decode team document"))
        .transpose()
}

fn store_team(conn: &Connection, team: &Team) -> Result<()> {
    let doc = serde_json::to_string(team).context("encode team document")?;
    // Upsert keeps the rowid, so insertion order survives updates.
    conn.execute(
        "INSERT INTO teams (team_name, doc) VALUES (?1, ?2)
         ON CONFLICT(team_name) DO UPDATE SET doc = excluded.doc",
        params![team.team_name, doc],
    )
    .context("write team")?;
    Ok(())
}

fn load_round(conn: &Connection, event_id: &str) -> Result<RoundState> {
    let state = conn
        .query_row(
            "SELECT active, round FROM events WHERE event_id = ?1",
            params![event_id],
            |row| {
                Ok(RoundState {
                    active: row.get(0)?,
                    round: row.get(1)?,
                })
            },
        )
        .optional()
        .context("read round state")?;
    Ok(state.unwrap_or_default())
}

impl Ledger for SqliteLedger {
    async fn team(&self, name: &str) -> Result<Option<Team>> {
        let name = name.to_string();
        self.with_conn(move |conn, _| load_team(conn, &name)).await
    }

    async fn teams(&self) -> Result<Vec<Team>> {
        self.with_conn(|conn, _| {
            let mut stmt = conn.prepare("SELECT doc FROM teams ORDER BY rowid ASC")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut teams = Vec::new();
            for row in rows {
                let doc = row?;
                teams.push(serde_json::from_str(&doc).context("decode team document")?);
            }
            Ok(teams)
        })
        .await
    }

    async fn put_team(&self, team: Team) -> Result<()> {
        self.with_conn(move |conn, changes| {
            store_team(conn, &team)?;
            let _ = changes.send(LedgerChange::Team(team));
            Ok(())
        })
        .await
    }

    async fn set_cash(&self, name: &str, cash: f64) -> Result<()> {
        let name = name.to_string();
        self.with_conn(move |conn, changes| {
            let Some(mut team) = load_team(conn, &name)? else {
                bail!("no team named {name}");
            };
            team.cash = cash;
            store_team(conn, &team)?;
            let _ = changes.send(LedgerChange::Team(team));
            Ok(())
        })
        .await
    }

    async fn round_state(&self) -> Result<RoundState> {
        let event_id = self.event_id.clone();
        self.with_conn(move |conn, _| load_round(conn, &event_id)).await
    }

    async fn merge_round(&self, patch: RoundPatch) -> Result<RoundState> {
        let event_id = self.event_id.clone();
        self.with_conn(move |conn, changes| {
            let mut state = load_round(conn, &event_id)?;
            state.merge(patch);
            conn.execute(
                "INSERT INTO events (event_id, active, round) VALUES (?1, ?2, ?3)
                 ON CONFLICT(event_id) DO UPDATE SET active = excluded.active, round = excluded.round",
                params![&*event_id, state.active, state.round],
            )
            .context("write round state")?;
            let _ = changes.send(LedgerChange::Round(state));
            Ok(state)
        })
        .await
    }

    async fn bet(&self, key: &BetKey) -> Result<Option<Bet>> {
        let bet_id = key.to_string();
        self.with_conn(move |conn, _| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM bets WHERE bet_id = ?1",
                    params![bet_id],
                    |row| row.get(0),
                )
                .optional()
                .context("read bet")?;
            doc.map(|doc| serde_json::from_str(&doc).context("decode bet document"))
                .transpose()
        })
        .await
    }

    async fn upsert_bet(&self, bet: Bet) -> Result<()> {
        self.with_conn(move |conn, changes| {
            let doc = serde_json::to_string(&bet).context("encode bet document")?;
            conn.execute(
                "INSERT INTO bets (bet_id, round, team_name, doc) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(bet_id) DO UPDATE SET doc = excluded.doc",
                params![bet.key().to_string(), bet.round, bet.team_name, doc],
            )
            .context("write bet")?;
            let _ = changes.send(LedgerChange::BetUpserted(bet));
            Ok(())
        })
        .await
    }

    async fn bets_for_round(&self, round: u64) -> Result<Vec<Bet>> {
        self.with_conn(move |conn, _| {
            let mut stmt =
                conn.prepare("SELECT doc FROM bets WHERE round = ?1 ORDER BY team_name ASC")?;
            let rows = stmt.query_map(params![round], |row| row.get::<_, String>(0))?;
            let mut bets = Vec::new();
            for row in rows {
                let doc = row?;
                bets.push(serde_json::from_str(&doc).context("decode bet document")?);
            }
            Ok(bets)
        })
        .await
    }

    async fn delete_bet(&self, key: &BetKey) -> Result<bool> {
        let key = key.clone();
        self.with_conn(move |conn, changes| {
            let removed = conn
                .execute("DELETE FROM bets WHERE bet_id = ?1", params![key.to_string()])
                .context("delete bet")?;
            if removed == 0 {
                return Ok(false);
            }
            let _ = changes.send(LedgerChange::BetDeleted(key));
            Ok(true)
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.changes.subscribe()
    }
}
