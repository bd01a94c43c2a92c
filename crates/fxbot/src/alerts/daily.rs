//! Daily chart reports

use crate::analysis::{self, ChartOptions, RateSeries, find_peaks, render_chart};
use crate::api::{RateProvider, historical_rate, latest_rate};
use crate::config::AlertConfig;
use crate::error::{BotError, Result};
use crate::interface::{Attachment, BotResponse};
use crate::models::CurrencyPair;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Timelike};
use cron::Schedule;
use futures::future::join_all;
use std::str::FromStr;
use tracing::{debug, warn};

const FREQUENCY_DAILY: &str = "DAILY";

/// `DAILY HH:MM` schedule in local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub at: NaiveTime,
}

impl DailySchedule {
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        let [frequency, time] = parts.as_slice() else {
            return Err(BotError::ScheduleSpecInvalid(
                "Schedule must look like DAILY HH:MM, e.g. DAILY 09:30".to_string(),
            ));
        };

        if !frequency.eq_ignore_ascii_case(FREQUENCY_DAILY) {
            return Err(BotError::ScheduleSpecInvalid(
                "Frequency not found. Only DAILY is applicable for now".to_string(),
            ));
        }

        let at = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| {
            BotError::ScheduleSpecInvalid(format!("Invalid time {time}, expected HH:MM"))
        })?;
        Ok(Self { at })
    }

    /// Seven-field cron expression firing at `at` on every day
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * * *", self.at.minute(), self.at.hour())
    }

    pub fn schedule(&self) -> Result<Schedule> {
        Schedule::from_str(&self.cron_expression())
            .map_err(|e| BotError::ScheduleSpecInvalid(e.to_string()))
    }

    /// Next fire time strictly after `now`, in the same zone
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Option<DateTime<Tz>>> {
        Ok(self.schedule()?.after(now).next())
    }
}

/// Days at which historical rates are sampled, oldest first
///
/// `samples` points spaced evenly across the `span_days` before `today`.
pub fn sample_dates(today: NaiveDate, span_days: u32, samples: u32) -> Vec<NaiveDate> {
    if samples == 0 {
        return Vec::new();
    }
    let step = (span_days / samples).max(1);
    (0..samples)
        .filter_map(|i| {
            let back = span_days.saturating_sub(i * step);
            today.checked_sub_days(Days::new(u64::from(back)))
        })
        .collect()
}

/// Builder for the daily report message
pub struct DailyReport;

impl DailyReport {
    /// Fetch history and today's rate, then chart it
    ///
    /// A chart that fails to render degrades to a text-only report.
    pub async fn build(
        provider: &dyn RateProvider,
        pair: &CurrencyPair,
        config: &AlertConfig,
        today: NaiveDate,
    ) -> Result<BotResponse> {
        let series = Self::collect_series(provider, pair, config, today).await?;
        let rates = series.rates();
        let peaks = find_peaks(&rates, config.report_peaks)?;
        let caption = analysis::caption(pair, &series)?;

        let render_pair = pair.clone();
        let chart = tokio::task::spawn_blocking(move || {
            render_chart(&render_pair, &series, &peaks, &ChartOptions::default())
        })
        .await
        .map_err(|e| BotError::ChartError(e.to_string()))
        .and_then(|r| r);

        match chart {
            Ok(png) => Ok(BotResponse::text(caption).with_attachment(Attachment::chart_png(png))),
            Err(e) => {
                warn!(%pair, error = %e, "Chart rendering failed, sending text only");
                Ok(BotResponse::text(caption))
            }
        }
    }

    /// Historical samples plus today's latest rate
    pub async fn collect_series(
        provider: &dyn RateProvider,
        pair: &CurrencyPair,
        config: &AlertConfig,
        today: NaiveDate,
    ) -> Result<RateSeries> {
        let dates = sample_dates(today, config.history_span_days, config.history_samples);
        let lookups = dates.iter().map(|&date| async move {
            historical_rate(provider, pair, date).await.map(|rate| (date, rate))
        });

        let mut series = RateSeries::new();
        for result in join_all(lookups).await {
            match result? {
                (date, Some(rate)) => series.insert(date, rate),
                (date, None) => debug!(%pair, %date, "No historical rate"),
            }
        }

        series.insert(today, latest_rate(provider, pair).await?);
        Ok(series)
    }
}
