use anyhow::Context;
use planebet_types::GameConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

const DATABASE_ENV: &str = "PLANEBET_DATABASE";
const LOG_LEVEL_ENV: &str = "PLANEBET_LOG_LEVEL";

/// Host configuration, read from YAML.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Where the logged-in team is remembered between runs.
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

fn default_database() -> PathBuf {
    PathBuf::from("planebet.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_file() -> PathBuf {
    PathBuf::from("planebet-session.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            database: default_database(),
            log_level: default_log_level(),
            session_file: default_session_file(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Game(#[from] planebet_types::ConfigError),
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must not be empty")]
    EmptyPath { field: &'static str },
}

pub struct ValidatedConfig {
    pub game: GameConfig,
    pub database: PathBuf,
    pub log_level: Level,
    pub session_file: PathBuf,
}

fn read_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Read `path` (or start from defaults) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Could not read config file {}", path.display()))?;
                serde_yaml::from_str(&raw).context("Could not parse config file")?
            }
            None => Config::default(),
        };
        config.apply_overrides(read_env);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(database) = lookup(DATABASE_ENV) {
            self.database = PathBuf::from(database);
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.log_level = level;
        }
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        self.game.validate()?;
        if self.database.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath { field: "database" });
        }
        if self.session_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath {
                field: "session_file",
            });
        }
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        Ok(ValidatedConfig {
            game: self.game,
            database: self.database,
            log_level,
            session_file: self.session_file,
        })
    }
}
