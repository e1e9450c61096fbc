use std::{env, str::FromStr};
use thiserror::Error;

use crate::services::ledger::{IncrementPolicy, LedgerPolicy, RatingScope};

/// Accepted `VOTE_COOLDOWN_HOURS`: one hour up to a year.
const COOLDOWN_HOURS_RANGE: std::ops::RangeInclusive<i64> = 1..=8760;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bot_token: String,
    pub owner_id: i64,
    pub jwt_secret: String,
    pub dashboard_password: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,

    // Ledger policy
    pub rating_scope: RatingScope,
    pub increment_policy: IncrementPolicy,
    pub vote_cooldown_hours: i64,
    pub max_mentions_per_message: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            bot_token: required("BOT_TOKEN")?,
            owner_id: parse("OWNER_ID", required("OWNER_ID")?)?,
            jwt_secret: required("JWT_SECRET")?,
            dashboard_password: required("DASHBOARD_PASSWORD")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed_or("PORT", 8080)?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:8080".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            rating_scope: parsed_or("RATING_SCOPE", RatingScope::PerChat)?,
            increment_policy: parsed_or("VOTE_INCREMENT_POLICY", IncrementPolicy::default())?,
            vote_cooldown_hours: in_range(
                "VOTE_COOLDOWN_HOURS",
                parsed_or("VOTE_COOLDOWN_HOURS", 24)?,
                COOLDOWN_HOURS_RANGE,
            )?,
            max_mentions_per_message: parsed_or("MAX_MENTIONS_PER_MESSAGE", 3)?,
        })
    }

    pub fn ledger_policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            cooldown: chrono::Duration::hours(self.vote_cooldown_hours),
            increment: self.increment_policy,
            scope: self.rating_scope,
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parsed_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => parse(name, value),
        Err(_) => Ok(default),
    }
}

fn in_range(
    name: &'static str,
    value: i64,
    range: std::ops::RangeInclusive<i64>,
) -> Result<i64, ConfigError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}
