use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_FEED_BUFFER, EVENT_ID, INITIAL_CASH};

/// Game-level settings shared by every ledger and session.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GameConfig {
    #[serde(default = "default_event_id")]
    pub event_id: String,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_feed_buffer")]
    pub feed_buffer: usize,
}

fn default_event_id() -> String {
    EVENT_ID.to_string()
}

fn default_initial_cash() -> f64 {
    INITIAL_CASH
}

fn default_feed_buffer() -> usize {
    DEFAULT_FEED_BUFFER
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            event_id: default_event_id(),
            initial_cash: default_initial_cash(),
            feed_buffer: default_feed_buffer(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be a positive finite number (got {value})")]
    InvalidAmount { field: &'static str, value: f64 },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: usize },
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_id.trim().is_empty() {
            return Err(ConfigError::Empty { field: "event_id" });
        }
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(ConfigError::InvalidAmount {
                field: "initial_cash",
                value: self.initial_cash,
            });
        }
        if self.feed_buffer == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "feed_buffer",
                value: self.feed_buffer,
            });
        }
        Ok(())
    }
}
