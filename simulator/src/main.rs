use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use planebet_execution::{
    bet_locked, query_round_book, watch_leaderboard, watch_round, FileSessionCache, Ledger,
    RoundController, Settlement, TeamSession,
};
use planebet_simulator::{Config, SqliteLedger, ValidatedConfig};
use planebet_types::{Bet, SessionRecord};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};

fn init_tracing(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML config file (defaults apply when omitted).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log round and leaderboard changes until interrupted.
    Watch,
    /// Open the next round.
    Start,
    /// Pause betting without settling.
    Stop,
    /// Settle the current round against the winning plane.
    Checkout { plane: Option<String> },
    /// Print the current round's bets and per-plane totals.
    Book,
    /// Print the leaderboard.
    Leaderboard,
    /// Log a team in and remember it locally.
    Login {
        #[arg(long)]
        team: String,
        #[arg(long)]
        rolls: String,
        #[arg(long)]
        email: String,
    },
    /// Place the logged-in team's bet for the current round.
    Bet { plane: String, amount: f64 },
    /// Forget the logged-in team.
    Logout,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("encode output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?
        .validate()
        .context("Invalid config")?;
    init_tracing(config.log_level);

    let ledger = Arc::new(
        SqliteLedger::open(&config.database, &config.game).context("Could not open ledger")?,
    );
    run(args.command, ledger, &config).await
}

async fn run(command: Command, ledger: Arc<SqliteLedger>, config: &ValidatedConfig) -> Result<()> {
    let cache = FileSessionCache::new(&config.session_file);
    match command {
        Command::Watch => watch(ledger).await?,
        Command::Start => {
            let mut rounds = RoundController::load(ledger).await?;
            let state = rounds.start().await?;
            println!("{state}");
        }
        Command::Stop => {
            let mut rounds = RoundController::load(ledger).await?;
            if !rounds.stop().await? {
                warn!("no round is active");
            }
            println!("{}", rounds.state());
        }
        Command::Checkout { plane } => {
            let mut rounds = RoundController::load(ledger).await?;
            match rounds.settle(plane.as_deref()).await? {
                Settlement::NoBets { round } => println!("round {round} closed with no bets"),
                Settlement::Aborted { round } => {
                    println!("round {round} not settled: give the winning plane")
                }
                Settlement::Settled(report) => {
                    for team in &report.skipped {
                        warn!(team = %team, "team record missing; balance untouched");
                    }
                    println!(
                        "round {} settled on plane {}: {} winners, {} losers",
                        report.plan.round,
                        report.plan.winning_plane,
                        report.plan.winners.len(),
                        report.plan.losers.len()
                    );
                }
            }
        }
        Command::Book => {
            let book = query_round_book(&*ledger).await?;
            println!("{} ({} staked)", book.state, book.total_staked());
            print_json(&book.bets)?;
            print_json(&book.totals)?;
        }
        Command::Leaderboard => {
            let board = planebet_execution::project(&ledger.teams().await?);
            print_json(&board)?;
        }
        Command::Login { team, rolls, email } => {
            let credentials = SessionRecord {
                team_name: team,
                rolls,
                institute_email: email,
            };
            let session = TeamSession::login(ledger, &cache, &config.game, credentials).await?;
            println!("logged in as {} ({:.0} cash)", session.team_name(), session.cash().await?);
        }
        Command::Bet { plane, amount } => {
            let Some(session) = TeamSession::restore(ledger.clone(), &cache)? else {
                anyhow::bail!("not logged in; run `login` first");
            };
            let bet = place_once(&*ledger, &session, &plane, amount).await?;
            print_json(&bet)?;
        }
        Command::Logout => match TeamSession::restore(ledger, &cache)? {
            Some(session) => {
                let team = session.team_name().to_string();
                session.logout(&cache)?;
                println!("logged out {team}");
            }
            None => println!("not logged in"),
        },
    }
    Ok(())
}

/// Place a bet unless the team already has one in the current round.
async fn place_once<L: Ledger>(
    ledger: &L,
    session: &TeamSession<L>,
    plane: &str,
    amount: f64,
) -> Result<Bet> {
    let round = ledger.round_state().await?.round;
    if bet_locked(ledger, session.team_name(), round).await? {
        anyhow::bail!("already bet in round {round}; waiting for checkout");
    }
    Ok(session.place_bet(plane, amount).await?)
}

async fn watch(ledger: Arc<SqliteLedger>) -> Result<()> {
    let mut round = watch_round(ledger.clone()).await?;
    let mut board = watch_leaderboard(ledger).await?;
    let initial = *round.borrow();
    info!(state = %initial, "watching event");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = round.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *round.borrow_and_update();
                info!(%state, "round changed");
            }
            changed = board.changed() => {
                if changed.is_err() {
                    break;
                }
                let leader = board
                    .borrow_and_update()
                    .first()
                    .map(|standing| (standing.team_name.clone(), standing.display_cash()));
                if let Some((team, cash)) = leader {
                    info!(%team, cash, "leaderboard changed");
                }
            }
        }
    }
    info!("stopped watching");
    Ok(())
}
