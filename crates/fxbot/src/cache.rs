//! Response caches for the rate provider

use crate::api::RateMap;
use cached::{Cached, TimedCache};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Base currency plus the requested symbols, order-insensitive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateQuery {
    pub base: String,
    pub symbols: Vec<String>,
}

impl RateQuery {
    pub fn new(base: &str, symbols: &[String]) -> Self {
        let mut symbols = symbols.to_vec();
        symbols.sort_unstable();
        symbols.dedup();
        Self {
            base: base.to_string(),
            symbols,
        }
    }
}

/// Shared map whose entries expire after a fixed lifespan
pub struct TtlCache<K, V> {
    entries: Arc<Mutex<TimedCache<K, V>>>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(TimedCache::with_lifespan(ttl))),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().await.cache_get(key).cloned()
    }

    pub async fn insert(&self, key: K, value: V) {
        self.entries.lock().await.cache_set(key, value);
    }

    /// Cached value for `key`, or the result of `fetcher`
    ///
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(?key, "Cache hit");
            return Ok(value);
        }

        tracing::debug!(?key, "Cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }
}

/// Caches for each provider endpoint
///
/// Latest rates use the short lifespan; historical rates and the currency
/// list use the reference lifespan.
#[derive(Clone)]
pub struct ProviderCache {
    pub latest: TtlCache<RateQuery, RateMap>,
    pub historical: TtlCache<(RateQuery, NaiveDate), BTreeMap<NaiveDate, RateMap>>,
    pub currencies: TtlCache<(), HashSet<String>>,
}

impl ProviderCache {
    pub fn new(latest_ttl: Duration, reference_ttl: Duration) -> Self {
        Self {
            latest: TtlCache::new(latest_ttl),
            historical: TtlCache::new(reference_ttl),
            currencies: TtlCache::new(reference_ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpy() -> RateMap {
        RateMap::from([("JPY".to_string(), 110.5)])
    }

    #[test]
    fn test_query_ignores_symbol_order() {
        let a = RateQuery::new("SGD", &["JPY".to_string(), "EUR".to_string()]);
        let b = RateQuery::new("SGD", &["EUR".to_string(), "JPY".to_string(), "EUR".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, RateQuery::new("USD", &["EUR".to_string(), "JPY".to_string()]));
    }

    #[tokio::test]
    async fn test_cache_insert_and_get() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let key = RateQuery::new("SGD", &["JPY".to_string()]);

        cache.insert(key.clone(), jpy()).await;
        assert_eq!(cache.get(&key).await, Some(jpy()));
        assert_eq!(cache.get(&RateQuery::new("SGD", &[])).await, None);
    }

    #[tokio::test]
    async fn test_cache_get_or_fetch() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let key = RateQuery::new("SGD", &["JPY".to_string()]);

        let mut call_count = 0;
        let result = cache
            .get_or_fetch(key.clone(), || {
                call_count += 1;
                async { Ok::<_, String>(jpy()) }
            })
            .await
            .unwrap();
        assert_eq!(result, jpy());

        let result = cache
            .get_or_fetch(key, || {
                call_count += 1;
                async { Ok::<_, String>(RateMap::new()) }
            })
            .await
            .unwrap();
        assert_eq!(result, jpy());
        assert_eq!(call_count, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_not_cached() {
        let cache: TtlCache<(), HashSet<String>> = TtlCache::new(Duration::from_secs(60));

        let result = cache.get_or_fetch((), || async { Err("down") }).await;
        assert!(result.is_err());
        assert_eq!(cache.get(&()).await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched() {
        let cache = TtlCache::new(Duration::from_secs(1));
        cache.insert((), 1u32).await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let value = cache.get_or_fetch((), || async { Ok::<_, String>(2) }).await;
        assert_eq!(value, Ok(2));
    }
}
