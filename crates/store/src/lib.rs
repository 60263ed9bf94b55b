use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use common::{Alarm, Condition, Error, Platform, PriceSample, Result};

const ALARM_COLUMNS: &str =
    "id, owner, symbol, target_price, condition, platform, active, created_at";

/// Durable record of alarms and price history, backed by SQLite.
///
/// Shared by the scheduler and the chat front-end. Every operation is a
/// single statement, so each one is atomic on its own; there are no
/// cross-row transactions. Cloning is cheap (the pool is reference counted).
#[derive(Clone)]
pub struct AlarmStore {
    db: SqlitePool,
}

impl AlarmStore {
    /// Open (creating if missing) the database at `database_url` and apply
    /// pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { db };
        store.migrate().await?;
        info!(url = %database_url, "Alarm store ready");
        Ok(store)
    }

    /// Single-connection in-memory store. Contents vanish with the store.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { db };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.db).await?;
        Ok(())
    }

    // ─── Alarms ──────────────────────────────────────────────────────────────

    /// Insert a new active alarm and return its id.
    pub async fn create_alarm(
        &self,
        owner: i64,
        symbol: &str,
        target_price: f64,
        condition: Condition,
        platform: Platform,
    ) -> Result<i64> {
        if !target_price.is_finite() || target_price <= 0.0 {
            return Err(Error::Validation(format!(
                "target price must be a positive number, got {target_price}"
            )));
        }
        if symbol.trim().is_empty() {
            return Err(Error::Validation("symbol must not be empty".into()));
        }

        let id = sqlx::query(
            r#"
            INSERT INTO alarms (owner, symbol, target_price, condition, platform, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
        )
        .bind(owner)
        .bind(symbol)
        .bind(target_price)
        .bind(condition)
        .bind(platform)
        .bind(Utc::now())
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        info!(id, owner, symbol, target_price, %condition, "Alarm created");
        Ok(id)
    }

    /// Snapshot of every active alarm, in creation order.
    pub async fn list_active_alarms(&self) -> Result<Vec<Alarm>> {
        let alarms = sqlx::query_as::<_, Alarm>(&format!(
            "SELECT {ALARM_COLUMNS} FROM alarms WHERE active = 1 ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(alarms)
    }

    /// Active alarms belonging to one owner, in creation order.
    pub async fn list_active_alarms_for_owner(&self, owner: i64) -> Result<Vec<Alarm>> {
        let alarms = sqlx::query_as::<_, Alarm>(&format!(
            "SELECT {ALARM_COLUMNS} FROM alarms WHERE active = 1 AND owner = ?1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(&self.db)
        .await?;
        Ok(alarms)
    }

    /// Look up an alarm regardless of its active flag.
    pub async fn get_alarm(&self, id: i64) -> Result<Option<Alarm>> {
        let alarm = sqlx::query_as::<_, Alarm>(&format!(
            "SELECT {ALARM_COLUMNS} FROM alarms WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(alarm)
    }

    /// Mark an alarm inactive. Unknown or already inactive ids are a no-op.
    pub async fn deactivate_alarm(&self, id: i64) -> Result<()> {
        let affected = sqlx::query("UPDATE alarms SET active = 0 WHERE id = ?1 AND active = 1")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if affected == 0 {
            debug!(id, "deactivate_alarm: alarm already inactive or missing");
        }
        Ok(())
    }

    /// Deactivate an alarm on behalf of its owner.
    ///
    /// Returns `true` only when an active alarm with this id belonged to
    /// `owner`. Alarms owned by anyone else are left untouched.
    pub async fn delete_alarm_if_owned(&self, id: i64, owner: i64) -> Result<bool> {
        let affected = sqlx::query(
            "UPDATE alarms SET active = 0 WHERE id = ?1 AND owner = ?2 AND active = 1",
        )
        .bind(id)
        .bind(owner)
        .execute(&self.db)
        .await?
        .rows_affected();

        if affected > 0 {
            info!(id, owner, "Alarm deleted by owner");
        }
        Ok(affected > 0)
    }

    // ─── Price history ───────────────────────────────────────────────────────

    /// Append one price observation.
    pub async fn record_price_sample(&self, symbol: &str, price: f64) -> Result<()> {
        if !price.is_finite() || price <= 0.0 {
            return Err(Error::Validation(format!(
                "price sample for {symbol} must be positive, got {price}"
            )));
        }

        sqlx::query("INSERT INTO price_samples (symbol, price, recorded_at) VALUES (?1, ?2, ?3)")
            .bind(symbol)
            .bind(price)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Most recent samples for a symbol, newest first.
    pub async fn recent_price_samples(&self, symbol: &str, limit: i64) -> Result<Vec<PriceSample>> {
        let samples = sqlx::query_as::<_, PriceSample>(
            r#"
            SELECT id, symbol, price, recorded_at FROM price_samples
            WHERE symbol = ?1 ORDER BY id DESC LIMIT ?2
            "#,
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(samples)
    }
}
