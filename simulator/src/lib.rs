//! Planebet event host.
//!
//! Provides a SQLite-backed [Ledger](planebet_execution::Ledger) and the
//! configuration used by the `planebet-host` binary.

mod config;
pub use config::{Config, ConfigError, ValidatedConfig};

mod sqlite;
pub use sqlite::SqliteLedger;
