use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://crypto_alarm.db";
pub const DEFAULT_BINANCE_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 5;
/// One day.
pub const MAX_CHECK_INTERVAL_MINUTES: u64 = 1440;

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    /// Empty means every user may talk to the bot.
    pub telegram_allowed_user_ids: Vec<i64>,

    // Database
    pub database_url: String,

    // Scheduler
    pub price_check_interval: Duration,

    // Price source
    pub binance_base_url: String,
    pub price_fetch_timeout: Option<Duration>,

    // Status API (served only when a port is configured)
    pub status_port: Option<u16>,
    pub status_token: Option<String>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let telegram_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config(
                "Required environment variable 'TELEGRAM_BOT_TOKEN' is not set. Check your .env file."
                    .into(),
            )
        })?;

        let telegram_allowed_user_ids = match get("TELEGRAM_ALLOWED_USER_IDS") {
            Some(raw) => parse_user_ids(&raw)?,
            None => Vec::new(),
        };

        let interval_minutes = match get("PRICE_CHECK_INTERVAL_MINUTES") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if (1..=MAX_CHECK_INTERVAL_MINUTES).contains(&n) => n,
                _ => {
                    return Err(Error::Config(format!(
                        "PRICE_CHECK_INTERVAL_MINUTES must be a whole number of minutes \
                         between 1 and {MAX_CHECK_INTERVAL_MINUTES}, got: '{raw}'"
                    )))
                }
            },
            None => DEFAULT_CHECK_INTERVAL_MINUTES,
        };

        let price_fetch_timeout = match get("PRICE_FETCH_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.parse().map_err(|_| {
                Error::Config(format!("PRICE_FETCH_TIMEOUT_SECS must be a number of seconds, got: '{raw}'"))
            })?)),
            None => None,
        };

        let status_port = match get("STATUS_PORT") {
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| {
                Error::Config(format!("STATUS_PORT must be a valid port, got: '{raw}'"))
            })?),
            None => None,
        };
        let status_token = get("STATUS_TOKEN");
        if status_port.is_some() && status_token.is_none() {
            return Err(Error::Config(
                "STATUS_TOKEN must be set when STATUS_PORT is configured".into(),
            ));
        }

        Ok(Config {
            telegram_token,
            telegram_allowed_user_ids,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            price_check_interval: Duration::from_secs(interval_minutes.saturating_mul(60)),
            binance_base_url: get("BINANCE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BINANCE_BASE_URL.to_string()),
            price_fetch_timeout,
            status_port,
            status_token,
        })
    }
}

fn parse_user_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                Error::Config(format!(
                    "TELEGRAM_ALLOWED_USER_IDS contains non-numeric ID: '{s}'"
                ))
            })
        })
        .collect()
}
