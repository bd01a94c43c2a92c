//! Exchange-rate Telegram bot
//!
//! This crate implements a chat bot around a currency-rate provider:
//!
//! - `/getrate` lookups against freecurrencyapi.com, rate limited and cached
//! - Daily alerts that send a chart of the last 60 days with peaks marked
//! - Conditional alerts that poll during business hours and notify when a
//!   rate passes a target and beats the stored high
//! - A multi-turn GST and service-charge calculator
//!
//! # Architecture
//!
//! Platforms (`platforms::telegram`, `platforms::cli`) turn inbound updates
//! into [`interface::Message`]s and hand them to [`bot::RateBot`]. The bot
//! answers directly or registers jobs with [`alerts::AlertScheduler`], which
//! talks back to users through the [`interface::ChatTransport`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use fxbot::{BotConfig, FreeCurrencyClient, MemoryRateStore};
//!
//! let config = BotConfig::from_env()?;
//! let provider = Arc::new(FreeCurrencyClient::new(&config.provider)?);
//! let scheduler = AlertScheduler::new(provider.clone(), Arc::new(MemoryRateStore::new()), transport, config.alerts.clone());
//! let bot = RateBot::new(provider, Arc::new(scheduler), config.calculator.clone());
//! ```

pub mod alerts;
pub mod analysis;
pub mod api;
pub mod bot;
pub mod cache;
pub mod config;
pub mod error;
pub mod gst;
pub mod interface;
pub mod models;
pub mod platforms;
pub mod store;

// Re-export main types for convenience
pub use alerts::{AlertScheduler, AlertSubscription};
pub use api::{FreeCurrencyClient, RateProvider};
pub use bot::RateBot;
pub use config::BotConfig;
pub use error::{BotError, Result};
pub use models::CurrencyPair;
pub use store::{MemoryRateStore, PgRateStore, RateStore};
