//! freecurrencyapi.com client

use super::{RateMap, RateProvider};
use crate::cache::{ProviderCache, RateQuery};
use crate::config::ProviderConfig;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::num::NonZeroU32;
use std::sync::Arc;
use url::Url;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// freecurrencyapi.com client
#[derive(Clone)]
pub struct FreeCurrencyClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    rate_limiter: SharedRateLimiter,
    cache: ProviderCache,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    data: RateMap,
}

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    data: HashMap<String, RateMap>,
}

#[derive(Debug, Deserialize)]
struct CurrenciesResponse {
    data: HashMap<String, Value>,
}

impl FreeCurrencyClient {
    /// Create a new client from provider settings
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        // Url::join drops the last path segment unless it ends with a slash
        let mut base = config.api_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| BotError::ConfigError(format!("Invalid API URL {base}: {e}")))?;

        let quota = Quota::per_minute(
            NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            cache: ProviderCache::new(config.cache_ttl_latest, config.cache_ttl_currencies),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| BotError::ConfigError(e.to_string()))?;

        let mut query = params;
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.clone()));
        }

        tracing::debug!(%url, "Requesting rates");
        let response = self.client.get(url).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(BotError::ApiError(format!("{endpoint} returned {status}: {message}")));
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn symbol_params(base: &str, symbols: &[String]) -> Vec<(&'static str, String)> {
        let mut params = vec![("base_currency", base.to_string())];
        if !symbols.is_empty() {
            params.push(("currencies", symbols.join(",")));
        }
        params
    }
}

/// Key the historical response by date, keeping only the day part of each stamp
fn parse_historical(data: HashMap<String, RateMap>) -> Result<BTreeMap<NaiveDate, RateMap>> {
    data.into_iter()
        .map(|(stamp, rates)| {
            // Some plans return a full timestamp
            let day_part = stamp.get(..10).unwrap_or(&stamp);
            NaiveDate::parse_from_str(day_part, DATE_FORMAT)
                .map(|d| (d, rates))
                .map_err(|e| BotError::ApiError(format!("Invalid date {stamp}: {e}")))
        })
        .collect()
}

#[async_trait]
impl RateProvider for FreeCurrencyClient {
    async fn latest(&self, base: &str, symbols: &[String]) -> Result<RateMap> {
        let query = RateQuery::new(base, symbols);
        self.cache
            .latest
            .get_or_fetch(query, || async {
                let response: LatestResponse = self
                    .get_json("latest", Self::symbol_params(base, symbols))
                    .await?;
                Ok::<_, BotError>(response.data)
            })
            .await
    }

    async fn historical(
        &self,
        base: &str,
        symbols: &[String],
        date: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, RateMap>> {
        let key = (RateQuery::new(base, symbols), date);
        self.cache
            .historical
            .get_or_fetch(key, || async {
                let mut params = Self::symbol_params(base, symbols);
                params.push(("date", date.format(DATE_FORMAT).to_string()));
                let response: HistoricalResponse = self.get_json("historical", params).await?;
                parse_historical(response.data)
            })
            .await
    }

    async fn supported_currencies(&self) -> Result<HashSet<String>> {
        self.cache
            .currencies
            .get_or_fetch((), || async {
                let response: CurrenciesResponse =
                    self.get_json("currencies", Vec::new()).await?;
                Ok::<_, BotError>(response.data.into_keys().map(|c| c.to_uppercase()).collect())
            })
            .await
    }
}
