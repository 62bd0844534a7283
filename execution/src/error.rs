use thiserror::Error;

use crate::validator::BetRejection;

/// Error type for round, settlement and session operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bet rejected: {0}")]
    Rejected(#[from] BetRejection),
    #[error("no active round to checkout")]
    NoActiveRound,
    #[error("team name, rolls and institute email are required")]
    MissingCredentials,
    #[error("store unavailable: {0:#}")]
    StoreUnavailable(#[from] anyhow::Error),
}

impl Error {
    /// Rejection reason, if this error is a validation failure.
    pub fn rejection(&self) -> Option<BetRejection> {
        match self {
            Error::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Result type for round, settlement and session operations.
pub type Result<T> = std::result::Result<T, Error>;
