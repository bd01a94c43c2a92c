//! Threshold alerts with a persisted high-water mark

use crate::api::{RateProvider, latest_rate};
use crate::config::{AlertConfig, ReminderGate};
use crate::error::Result;
use crate::models::CurrencyPair;
use crate::store::RateStore;
use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Timelike, Utc, Weekday};
use tracing::debug;

/// What a single poll of a conditional alert did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Weekend or outside the active hours, the provider was not called
    OutsideWindow,
    /// Rate is under the target
    BelowTarget { rate: f64 },
    /// Rate reached the target but did not beat the stored rate
    NotHigher { rate: f64, stored: f64 },
    /// Rate was stored as the new high
    Persisted { rate: f64, notified: bool },
}

/// Weekday and hour gate for conditional polling
///
/// The local hour must be strictly after `active_after_hour` and no later
/// than `active_until_hour`.
pub fn in_active_window<Tz: TimeZone>(now: &DateTime<Tz>, config: &AlertConfig) -> bool {
    if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let hour = now.hour();
    hour > config.active_after_hour && hour <= config.active_until_hour
}

/// Whether a reminder may be sent for a record last written at `last`
pub fn reminder_due(
    gate: ReminderGate,
    interval_minutes: u32,
    last: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    let interval = i64::from(interval_minutes);
    match gate {
        ReminderGate::MinuteOfHour => {
            let from_hour = |m: u32| (60 - i64::from(m)).abs();
            (from_hour(last.minute()) - from_hour(now.minute())).abs() == interval
        }
        ReminderGate::Elapsed => (now - last).num_minutes() >= interval,
    }
}

/// A conditional alert bound to its pair and target
#[derive(Debug, Clone)]
pub struct ConditionalAlert {
    pub pair: CurrencyPair,
    pub target: f64,
    config: AlertConfig,
}

impl ConditionalAlert {
    pub fn new(pair: CurrencyPair, target: f64, config: AlertConfig) -> Self {
        Self {
            pair,
            target,
            config,
        }
    }

    /// Run one poll at local time `now`
    ///
    /// The last rate is keyed by the quote currency. A higher rate is always
    /// stored; the gate only decides whether the user hears about it. A store
    /// failure fails the tick, so nothing is sent while the store is down.
    pub async fn evaluate(
        &self,
        provider: &dyn RateProvider,
        store: &dyn RateStore,
        now: DateTime<FixedOffset>,
    ) -> Result<TickOutcome> {
        if !in_active_window(&now, &self.config) {
            debug!(pair = %self.pair, %now, "Outside alert window");
            return Ok(TickOutcome::OutsideWindow);
        }

        let rate = latest_rate(provider, &self.pair).await?;
        if rate < self.target {
            return Ok(TickOutcome::BelowTarget { rate });
        }

        let notified = match store.last_rate(&self.pair.to).await? {
            None => true,
            Some(record) if rate > record.rate => reminder_due(
                self.config.reminder_gate,
                self.config.remind_interval_minutes,
                record.updated_at,
                now.with_timezone(&Utc),
            ),
            Some(record) => {
                return Ok(TickOutcome::NotHigher {
                    rate,
                    stored: record.rate,
                });
            }
        };

        let rows = store.update_rate(&self.pair.to, rate).await?;
        debug!(pair = %self.pair, rate, rows, notified, "Stored new high");
        Ok(TickOutcome::Persisted { rate, notified })
    }

    pub fn notification(&self, rate: f64) -> String {
        format!(
            "🔔 {} has reached 1 {} - {rate:.4} {}, above your target of {:.4}.",
            self.pair, self.pair.from, self.pair.to, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockRateProvider, RateMap};
    use crate::error::BotError;
    use crate::store::{LastRateRecord, MockRateStore};

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    fn utc(h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, min, 0).unwrap()
    }

    fn alert() -> ConditionalAlert {
        ConditionalAlert::new(CurrencyPair::new("SGD", "JPY"), 110.0, AlertConfig::default())
    }

    fn provider_returning(rate: f64) -> MockRateProvider {
        let mut provider = MockRateProvider::new();
        provider
            .expect_latest()
            .times(1)
            .returning(move |_, _| Ok(RateMap::from([("JPY".to_string(), rate)])));
        provider
    }

    #[test]
    fn test_active_window() {
        let config = AlertConfig::default();
        // 2024-03-04 is a Monday
        assert!(in_active_window(&local(2024, 3, 4, 10, 0), &config));
        assert!(in_active_window(&local(2024, 3, 4, 19, 59), &config));
        assert!(!in_active_window(&local(2024, 3, 4, 9, 30), &config));
        assert!(!in_active_window(&local(2024, 3, 4, 20, 0), &config));
        assert!(!in_active_window(&local(2024, 3, 4, 22, 0), &config));
        assert!(!in_active_window(&local(2024, 3, 2, 12, 0), &config));
        assert!(!in_active_window(&local(2024, 3, 3, 12, 0), &config));
    }

    #[test]
    fn test_minute_of_hour_gate() {
        let gate = ReminderGate::MinuteOfHour;
        assert!(reminder_due(gate, 45, utc(1, 5), utc(2, 50)));
        assert!(reminder_due(gate, 45, utc(1, 50), utc(3, 5)));
        assert!(!reminder_due(gate, 45, utc(1, 5), utc(2, 49)));
        // Hours apart but same minute never passes
        assert!(!reminder_due(gate, 45, utc(1, 5), utc(6, 5)));
    }

    #[test]
    fn test_elapsed_gate() {
        let gate = ReminderGate::Elapsed;
        assert!(reminder_due(gate, 45, utc(1, 0), utc(1, 45)));
        assert!(reminder_due(gate, 45, utc(1, 0), utc(6, 5)));
        assert!(!reminder_due(gate, 45, utc(1, 0), utc(1, 44)));
    }

    #[tokio::test]
    async fn test_outside_window_skips_provider() {
        let mut provider = MockRateProvider::new();
        provider.expect_latest().never();
        let mut store = MockRateStore::new();
        store.expect_last_rate().never();
        store.expect_update_rate().never();

        let saturday = alert().evaluate(&provider, &store, local(2024, 3, 2, 12, 0)).await;
        assert_eq!(saturday.unwrap(), TickOutcome::OutsideWindow);

        let late = alert().evaluate(&provider, &store, local(2024, 3, 4, 22, 0)).await;
        assert_eq!(late.unwrap(), TickOutcome::OutsideWindow);
    }

    #[tokio::test]
    async fn test_below_target() {
        let provider = provider_returning(109.5);
        let mut store = MockRateStore::new();
        store.expect_last_rate().never();
        store.expect_update_rate().never();

        let outcome = alert()
            .evaluate(&provider, &store, local(2024, 3, 4, 12, 0))
            .await
            .unwrap();
        assert_eq!(outcome, TickOutcome::BelowTarget { rate: 109.5 });
    }

    #[tokio::test]
    async fn test_first_observation_persists_and_notifies() {
        let provider = provider_returning(111.0);
        let mut store = MockRateStore::new();
        store.expect_last_rate().times(1).returning(|_| Ok(None));
        store.expect_update_rate().times(1).returning(|_, _| Ok(1));

        let outcome = alert()
            .evaluate(&provider, &store, local(2024, 3, 4, 12, 0))
            .await
            .unwrap();
        assert_eq!(outcome, TickOutcome::Persisted { rate: 111.0, notified: true });
    }

    #[tokio::test]
    async fn test_higher_rate_persists_even_when_gate_closed() {
        let provider = provider_returning(112.0);
        let mut store = MockRateStore::new();
        store.expect_last_rate().times(1).returning(|_| {
            Ok(Some(LastRateRecord {
                currency: "JPY".to_string(),
                rate: 111.0,
                // Same minute as the poll, so the minute gate is closed
                updated_at: Utc.with_ymd_and_hms(2024, 3, 4, 3, 0, 0).unwrap(),
            }))
        });
        store.expect_update_rate().times(1).returning(|_, _| Ok(1));

        let outcome = alert()
            .evaluate(&provider, &store, local(2024, 3, 4, 12, 0))
            .await
            .unwrap();
        assert_eq!(outcome, TickOutcome::Persisted { rate: 112.0, notified: false });
    }

    #[tokio::test]
    async fn test_higher_rate_notifies_when_gate_open() {
        let provider = provider_returning(112.0);
        let mut store = MockRateStore::new();
        store.expect_last_rate().returning(|_| {
            Ok(Some(LastRateRecord {
                currency: "JPY".to_string(),
                rate: 111.0,
                updated_at: Utc.with_ymd_and_hms(2024, 3, 4, 3, 5, 0).unwrap(),
            }))
        });
        store.expect_update_rate().times(1).returning(|_, _| Ok(1));

        // 12:50 local is 04:50 UTC, 45 minutes of hour after 03:05
        let outcome = alert()
            .evaluate(&provider, &store, local(2024, 3, 4, 12, 50))
            .await
            .unwrap();
        assert_eq!(outcome, TickOutcome::Persisted { rate: 112.0, notified: true });
    }

    #[tokio::test]
    async fn test_not_higher_than_stored() {
        let provider = provider_returning(111.0);
        let mut store = MockRateStore::new();
        store.expect_last_rate().returning(|_| {
            Ok(Some(LastRateRecord {
                currency: "JPY".to_string(),
                rate: 111.0,
                updated_at: Utc::now(),
            }))
        });
        store.expect_update_rate().never();

        let outcome = alert()
            .evaluate(&provider, &store, local(2024, 3, 4, 12, 0))
            .await
            .unwrap();
        assert_eq!(outcome, TickOutcome::NotHigher { rate: 111.0, stored: 111.0 });
    }

    #[tokio::test]
    async fn test_store_outage_never_notifies() {
        let mut provider = MockRateProvider::new();
        provider
            .expect_latest()
            .times(6)
            .returning(|_, _| Ok(RateMap::from([("JPY".to_string(), 111.0)])));
        let mut store = MockRateStore::new();
        store
            .expect_last_rate()
            .times(6)
            .returning(|_| Err(BotError::DatabaseError(sqlx::Error::PoolTimedOut)));
        store.expect_update_rate().never();

        let alert = alert();
        for minute in [0, 10, 20, 30, 40, 50] {
            let result = alert
                .evaluate(&provider, &store, local(2024, 3, 4, 12, minute))
                .await;
            assert!(matches!(result, Err(BotError::DatabaseError(_))));
        }
    }

    #[tokio::test]
    async fn test_failed_write_fails_tick() {
        let provider = provider_returning(111.0);
        let mut store = MockRateStore::new();
        store.expect_last_rate().returning(|_| Ok(None));
        store
            .expect_update_rate()
            .times(1)
            .returning(|_, _| Err(BotError::DatabaseError(sqlx::Error::PoolClosed)));

        let result = alert()
            .evaluate(&provider, &store, local(2024, 3, 4, 12, 0))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_notification_text() {
        assert_eq!(
            alert().notification(110.5),
            "🔔 SGD-JPY has reached 1 SGD - 110.5000 JPY, above your target of 110.0000."
        );
    }
}
