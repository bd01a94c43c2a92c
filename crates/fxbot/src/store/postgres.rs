//! PostgreSQL-backed rate store

use super::{LastRateRecord, RateStore};
use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::{info, warn};

/// Rate store over the `exchange_rate` table
#[derive(Debug, Clone)]
pub struct PgRateStore {
    pool: PgPool,
}

impl PgRateStore {
    /// Connect with `config` and make sure the schema exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(host = %config.host, database = %config.database, "Connecting to PostgreSQL");

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create the table if it is missing
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS exchange_rate (
                currency VARCHAR(8) PRIMARY KEY,
                rate DOUBLE PRECISION NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        info!("exchange_rate table ready");
        Ok(())
    }

    async fn fetch(&self, currency: &str) -> sqlx::Result<Option<LastRateRecord>> {
        let row = sqlx::query(
            "SELECT currency, rate, updated_at FROM exchange_rate WHERE currency = $1",
        )
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(LastRateRecord {
                currency: row.try_get("currency")?,
                rate: row.try_get("rate")?,
                updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            })
        })
        .transpose()
    }

    async fn upsert(&self, currency: &str, rate: f64) -> sqlx::Result<u64> {
        let result = sqlx::query(
            r"
            INSERT INTO exchange_rate (currency, rate, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (currency)
            DO UPDATE SET rate = EXCLUDED.rate, updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(currency)
        .bind(rate)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    async fn last_rate(&self, currency: &str) -> Result<Option<LastRateRecord>> {
        self.fetch(currency).await.map_err(|e| {
            warn!(currency, error = %e, "Failed to read last rate");
            e.into()
        })
    }

    async fn update_rate(&self, currency: &str, rate: f64) -> Result<u64> {
        self.upsert(currency, rate).await.map_err(|e| {
            warn!(currency, rate, error = %e, "Failed to store rate");
            e.into()
        })
    }
}
