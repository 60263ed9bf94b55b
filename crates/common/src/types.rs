use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Direction in which the price must cross the alarm target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Condition {
    Above,
    Below,
}

impl Condition {
    /// Past-tense wording used in trigger notifications.
    pub fn crossed_text(&self) -> &'static str {
        match self {
            Condition::Above => "exceeded",
            Condition::Below => "fell below",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Above => write!(f, "above"),
            Condition::Below => write!(f, "below"),
        }
    }
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(Condition::Above),
            "below" => Ok(Condition::Below),
            other => Err(Error::Validation(format!(
                "condition must be 'above' or 'below', got '{other}'"
            ))),
        }
    }
}

/// Notification channel that owns an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Telegram,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Telegram => write!(f, "telegram"),
        }
    }
}

/// A standing request to notify `owner` once `symbol` crosses `target_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alarm {
    pub id: i64,
    /// Platform-specific recipient id (Telegram chat id).
    pub owner: i64,
    pub symbol: String,
    pub target_price: f64,
    pub condition: Condition,
    pub platform: Platform,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// One observed price, appended on every successful check of an alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriceSample {
    pub id: i64,
    pub symbol: String,
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Point-in-time view of the alarm scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SchedulerStatus {
    pub running: bool,
    /// Approximate time the next tick is due. `None` while stopped.
    pub next_tick: Option<DateTime<Utc>>,
    pub scheduled_jobs: usize,
}

impl std::fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.running { "running" } else { "stopped" };
        match self.next_tick {
            Some(at) => write!(
                f,
                "{state} (jobs: {}, next check: {} UTC)",
                self.scheduled_jobs,
                at.format("%H:%M:%S")
            ),
            None => write!(f, "{state} (jobs: {})", self.scheduled_jobs),
        }
    }
}

/// Normalize a user-typed symbol into exchange form (`btcusdt` → `BTCUSDT`).
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}
