//! Configuration for the exchange-rate bot

use crate::error::{BotError, Result};
use chrono::{FixedOffset, Offset, Utc};
use fxbot_utils::{env_or, env_parse_or};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// How a conditional alert decides whether a new high is worth a reminder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderGate {
    /// Difference of the "minutes until the hour" of the last update and of now
    /// must equal the remind interval exactly
    #[default]
    MinuteOfHour,
    /// At least the remind interval must have elapsed since the last update
    Elapsed,
}

impl FromStr for ReminderGate {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "minute-of-hour" | "minute_of_hour" | "minute" => Ok(Self::MinuteOfHour),
            "elapsed" => Ok(Self::Elapsed),
            other => Err(BotError::ConfigError(format!("Unknown reminder gate: {other}"))),
        }
    }
}

/// Rate provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the rate API, ending with a slash
    pub api_url: String,
    /// API key sent with every request
    pub api_key: Option<String>,
    /// Maximum requests per minute
    pub rate_limit_per_minute: u32,
    /// Timeout for each HTTP request
    pub request_timeout: Duration,
    /// Cache TTL for latest rates
    pub cache_ttl_latest: Duration,
    /// Cache TTL for the supported-currency list
    pub cache_ttl_currencies: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.freecurrencyapi.com/v1/".to_string(),
            api_key: None,
            rate_limit_per_minute: 10,
            request_timeout: Duration::from_secs(30),
            cache_ttl_latest: Duration::from_secs(60),      // 1 minute
            cache_ttl_currencies: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Alert scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Polling interval of conditional alerts
    pub check_interval: Duration,
    /// Reminder spacing of conditional alerts, in minutes
    pub remind_interval_minutes: u32,
    /// Reminder rule for conditional alerts
    pub reminder_gate: ReminderGate,
    /// Offset of the bot's local time from UTC, in hours
    pub utc_offset_hours: i32,
    /// Conditional alerts run only when the local hour is greater than this
    pub active_after_hour: u32,
    /// ... and less than or equal to this
    pub active_until_hour: u32,
    /// Number of historical samples in a daily report
    pub history_samples: u32,
    /// Days covered by the historical samples
    pub history_span_days: u32,
    /// Peaks highlighted in a daily report
    pub report_peaks: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(600),
            remind_interval_minutes: 45,
            reminder_gate: ReminderGate::default(),
            utc_offset_hours: 8,
            active_after_hour: 9,
            active_until_hour: 19,
            history_samples: 10,
            history_span_days: 60,
            report_peaks: 5,
        }
    }
}

impl AlertConfig {
    /// Fixed offset used for all local-time decisions
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

/// GST/service-charge calculator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorConfig {
    /// Default GST rate as a fraction
    pub gst_rate: f64,
    /// Default service-charge rate as a fraction
    pub svc_charge_rate: f64,
    /// Idle time after which a calculator session is dropped
    pub session_ttl: Duration,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            gst_rate: 0.09,
            svc_charge_rate: 0.1,
            session_ttl: Duration::from_secs(1800),
        }
    }
}

/// Postgres connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DatabaseConfig {
    /// Load from the standard `PG*` variables; `None` when `PGHOST` is unset
    pub fn from_env() -> Result<Option<Self>> {
        let host = env_or("PGHOST", "");
        if host.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            host,
            port: env_parse_or("PGPORT", 5432)?,
            user: env_or("PGUSER", "postgres"),
            password: env_or("PGPASSWORD", ""),
            database: env_or("PGDATABASE", "postgres"),
        }))
    }
}

/// Configuration for the exchange-rate bot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// Rate provider settings
    pub provider: ProviderConfig,
    /// Alert settings
    pub alerts: AlertConfig,
    /// Calculator settings
    pub calculator: CalculatorConfig,
    /// Database settings; in-memory store when absent
    pub database: Option<DatabaseConfig>,
}

impl BotConfig {
    /// Create a new configuration builder
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let provider = ProviderConfig {
            api_url: env_or("FREECURRENCY_API_URL", &defaults.provider.api_url),
            api_key: std::env::var("FREECURRENCY_API_KEY").ok().filter(|k| !k.is_empty()),
            rate_limit_per_minute: env_parse_or(
                "PROVIDER_RATE_LIMIT",
                defaults.provider.rate_limit_per_minute,
            )?,
            request_timeout: Duration::from_secs(env_parse_or(
                "REQUEST_TIMEOUT_SECS",
                defaults.provider.request_timeout.as_secs(),
            )?),
            ..defaults.provider
        };

        let alerts = AlertConfig {
            check_interval: Duration::from_secs(env_parse_or(
                "CONDITIONAL_CHECK_INTERVAL",
                defaults.alerts.check_interval.as_secs(),
            )?),
            remind_interval_minutes: env_parse_or(
                "CONDITIONAL_REMIND_INTERVAL",
                defaults.alerts.remind_interval_minutes,
            )?,
            reminder_gate: env_or("REMIND_GATE", "minute-of-hour").parse()?,
            utc_offset_hours: env_parse_or("UTC_OFFSET_HOURS", defaults.alerts.utc_offset_hours)?,
            ..defaults.alerts
        };

        let calculator = CalculatorConfig {
            gst_rate: env_parse_or("GST_RATE", defaults.calculator.gst_rate)?,
            svc_charge_rate: env_parse_or("SVC_CHARGE", defaults.calculator.svc_charge_rate)?,
            session_ttl: Duration::from_secs(env_parse_or(
                "SESSION_TTL_SECS",
                defaults.calculator.session_ttl.as_secs(),
            )?),
        };

        let config = Self {
            provider,
            alerts,
            calculator,
            database: DatabaseConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider.rate_limit_per_minute == 0 {
            return Err(BotError::ConfigError(
                "rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.alerts.check_interval.is_zero() {
            return Err(BotError::ConfigError(
                "check_interval must be greater than 0".to_string(),
            ));
        }

        if self.alerts.reminder_gate == ReminderGate::MinuteOfHour
            && self.alerts.remind_interval_minutes >= 60
        {
            return Err(BotError::ConfigError(
                "remind_interval_minutes must be below 60 for the minute-of-hour gate".to_string(),
            ));
        }

        if !(-12..=14).contains(&self.alerts.utc_offset_hours) {
            return Err(BotError::ConfigError(format!(
                "utc_offset_hours out of range: {}",
                self.alerts.utc_offset_hours
            )));
        }

        if self.alerts.active_after_hour >= self.alerts.active_until_hour
            || self.alerts.active_until_hour > 23
        {
            return Err(BotError::ConfigError(
                "active window hours are out of order".to_string(),
            ));
        }

        if self.alerts.history_samples == 0 {
            return Err(BotError::ConfigError(
                "history_samples must be greater than 0".to_string(),
            ));
        }

        for (name, rate) in [
            ("gst_rate", self.calculator.gst_rate),
            ("svc_charge_rate", self.calculator.svc_charge_rate),
        ] {
            if !rate.is_finite() || rate <= 0.0 || rate > 1.0 {
                return Err(BotError::ConfigError(format!(
                    "{name} must be a fraction in (0, 1], got {rate}"
                )));
            }
        }

        Ok(())
    }
}

/// Builder for BotConfig
#[derive(Debug, Default)]
pub struct BotConfigBuilder {
    provider: Option<ProviderConfig>,
    alerts: Option<AlertConfig>,
    calculator: Option<CalculatorConfig>,
    database: Option<DatabaseConfig>,
}

impl BotConfigBuilder {
    /// Set provider settings
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set alert settings
    pub fn alerts(mut self, alerts: AlertConfig) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Set calculator settings
    pub fn calculator(mut self, calculator: CalculatorConfig) -> Self {
        self.calculator = Some(calculator);
        self
    }

    /// Set database settings
    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<BotConfig> {
        let config = BotConfig {
            provider: self.provider.unwrap_or_default(),
            alerts: self.alerts.unwrap_or_default(),
            calculator: self.calculator.unwrap_or_default(),
            database: self.database,
        };

        config.validate()?;
        Ok(config)
    }
}
