// Runtime configuration
//
// Values come from environment variables; anything unset falls back to the
// defaults below.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::blockchain::pow::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};

/// Reward paid by every minted block
pub const DEFAULT_MINING_REWARD: f64 = 10.0;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Errors raised while reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Consensus parameters of a ledger
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Number of leading zero hex digits a block hash needs
    pub difficulty: usize,

    /// Amount credited by each coinbase transaction
    pub mining_reward: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
        }
    }
}

impl LedgerConfig {
    /// Reads `LEDGER_DIFFICULTY` and `LEDGER_MINING_REWARD`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = LedgerConfig::default();

        let difficulty = parse_or("LEDGER_DIFFICULTY", &lookup, defaults.difficulty)?;
        if difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::InvalidValue {
                key: "LEDGER_DIFFICULTY",
                value: difficulty.to_string(),
                reason: "a SHA-256 hex digest has only 64 digits".to_string(),
            });
        }

        let mining_reward = parse_or("LEDGER_MINING_REWARD", &lookup, defaults.mining_reward)?;
        if !mining_reward.is_finite() || mining_reward < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "LEDGER_MINING_REWARD",
                value: mining_reward.to_string(),
                reason: "must be a finite, non-negative number".to_string(),
            });
        }

        Ok(LedgerConfig {
            difficulty,
            mining_reward,
        })
    }
}

/// Where the HTTP API listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Reads `LEDGER_HOST` and `LEDGER_PORT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        Ok(ServerConfig {
            host: lookup("LEDGER_HOST").unwrap_or(defaults.host),
            port: parse_or("LEDGER_PORT", &lookup, defaults.port)?,
        })
    }
}

fn parse_or<T>(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::InvalidValue {
                key,
                reason: e.to_string(),
                value,
            }),
        },
    }
}
