//! API clients for exchange-rate providers

pub mod freecurrency;

pub use freecurrency::FreeCurrencyClient;

use crate::error::{BotError, PairSide, Result};
use crate::models::CurrencyPair;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Rates keyed by currency code, each the price of one unit of the base currency
pub type RateMap = HashMap<String, f64>;

/// Source of exchange rates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Latest rates of `symbols` against `base`
    async fn latest(&self, base: &str, symbols: &[String]) -> Result<RateMap>;

    /// Rates of `symbols` against `base` on `date`
    async fn historical(
        &self,
        base: &str,
        symbols: &[String],
        date: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, RateMap>>;

    /// Every currency code the provider can quote
    async fn supported_currencies(&self) -> Result<HashSet<String>>;
}

/// Latest rate of one unit of `pair.from` in `pair.to`
pub async fn latest_rate(provider: &dyn RateProvider, pair: &CurrencyPair) -> Result<f64> {
    let rates = provider.latest(&pair.from, &[pair.to.clone()]).await?;
    rates.get(&pair.to).copied().ok_or_else(|| BotError::CurrencyNotFound {
        side: PairSide::To,
        code: pair.to.clone(),
    })
}

/// Rate of `pair` on `date`, if the provider has one
pub async fn historical_rate(
    provider: &dyn RateProvider,
    pair: &CurrencyPair,
    date: NaiveDate,
) -> Result<Option<f64>> {
    let by_date = provider
        .historical(&pair.from, &[pair.to.clone()], date)
        .await?;
    Ok(by_date
        .get(&date)
        .or_else(|| by_date.values().next())
        .and_then(|rates| rates.get(&pair.to))
        .copied())
}

/// Check both codes of `pair` against the provider's supported set
pub async fn validate_pair(provider: &dyn RateProvider, pair: &CurrencyPair) -> Result<()> {
    let supported = provider.supported_currencies().await?;

    if !supported.contains(&pair.from) {
        return Err(BotError::CurrencyNotFound {
            side: PairSide::From,
            code: pair.from.clone(),
        });
    }
    if !supported.contains(&pair.to) {
        return Err(BotError::CurrencyNotFound {
            side: PairSide::To,
            code: pair.to.clone(),
        });
    }
    Ok(())
}
