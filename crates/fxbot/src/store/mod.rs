//! Persistence of the last rate seen per currency

pub mod postgres;

pub use postgres::PgRateStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Highest rate stored for a currency and when it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastRateRecord {
    pub currency: String,
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
}

/// Storage for [`LastRateRecord`]s
///
/// `Ok(None)` means the currency has no row yet. A failed read is an error,
/// never `None`, so callers can tell an outage from a first observation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Last stored record for `currency`
    async fn last_rate(&self, currency: &str) -> Result<Option<LastRateRecord>>;

    /// Store `rate` for `currency` stamped with the current time, returning rows affected
    async fn update_rate(&self, currency: &str, rate: f64) -> Result<u64>;
}

/// Process-local store used when no database is configured
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    records: RwLock<HashMap<String, LastRateRecord>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn last_rate(&self, currency: &str) -> Result<Option<LastRateRecord>> {
        Ok(self.records.read().await.get(currency).cloned())
    }

    async fn update_rate(&self, currency: &str, rate: f64) -> Result<u64> {
        let record = LastRateRecord {
            currency: currency.to_string(),
            rate,
            updated_at: Utc::now(),
        };
        self.records
            .write()
            .await
            .insert(currency.to_string(), record);
        Ok(1)
    }
}
