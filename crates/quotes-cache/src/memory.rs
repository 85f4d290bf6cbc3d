//! In-memory cache implementation.

use async_trait::async_trait;
use quotes_core::{DEFAULT_QUOTE_TTL, Quote, QuoteCache, Result, Symbol};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Cache entry with timestamp for TTL-based invalidation.
#[derive(Debug, Clone)]
struct CacheEntry {
    quote: Quote,
    cached_at: Instant,
}

impl CacheEntry {
    fn new(quote: Quote) -> Self {
        Self {
            quote,
            cached_at: Instant::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() >= ttl
    }
}

/// Process-local quote cache with a fixed time-to-live.
///
/// Entries live in a `RwLock`-protected `HashMap` keyed by uppercase symbol
/// and are lost when the cache is dropped. Expired entries are evicted lazily
/// on the first lookup after expiry, or eagerly via
/// [`QuoteCache::invalidate_stale`].
#[derive(Debug)]
pub struct InMemoryCache {
    quotes: RwLock<HashMap<Symbol, CacheEntry>>,
    ttl: Duration,
}

impl InMemoryCache {
    /// Create a new empty cache with the default five minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_QUOTE_TTL)
    }

    /// Create a new empty cache with a custom TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            quotes: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// The configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.quotes.read().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.quotes.read().await.is_empty()
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteCache for InMemoryCache {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn get_quote(&self, symbol: &Symbol) -> Result<Option<Quote>> {
        {
            let cache = self.quotes.read().await;
            match cache.get(symbol) {
                Some(entry) if !entry.is_stale(self.ttl) => {
                    debug!(age = ?entry.cached_at.elapsed(), "Cache hit for quote");
                    return Ok(Some(entry.quote.clone()));
                }
                Some(_) => {}
                None => {
                    debug!("Cache miss for quote");
                    return Ok(None);
                }
            }
        }

        // Re-check under the write lock: a concurrent writer may have refreshed it.
        let mut cache = self.quotes.write().await;
        match cache.get(symbol) {
            Some(entry) if !entry.is_stale(self.ttl) => Ok(Some(entry.quote.clone())),
            Some(_) => {
                cache.remove(symbol);
                debug!("Cache entry expired, evicted");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, quote), fields(symbol = %symbol, source = %quote.source))]
    async fn put_quote(&self, symbol: &Symbol, quote: &Quote) -> Result<()> {
        let mut cache = self.quotes.write().await;
        cache.insert(symbol.clone(), CacheEntry::new(quote.clone()));
        debug!("Cached quote");
        Ok(())
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn invalidate(&self, symbol: &Symbol) -> Result<bool> {
        let removed = self.quotes.write().await.remove(symbol).is_some();
        if removed {
            debug!("Cleared cached quote");
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self) -> Result<usize> {
        let mut cache = self.quotes.write().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_stale(self.ttl));
        let removed = before - cache.len();

        if removed > 0 {
            debug!("Invalidated {} stale cache entries", removed);
        }

        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.quotes.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotes_core::QuoteSource;

    fn quote(ticker: &str, price: f64) -> Quote {
        Quote {
            last_price: price,
            ..Quote::new(Symbol::new(ticker), QuoteSource::Finnhub)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_hit_within_ttl() {
        let cache = InMemoryCache::new();
        let symbol = Symbol::new("AAPL");

        // Initially no data
        assert!(cache.get_quote(&symbol).await.unwrap().is_none());

        cache.put_quote(&symbol, &quote("AAPL", 190.0)).await.unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;

        let cached = cache.get_quote(&symbol).await.unwrap().unwrap();
        assert_eq!(cached.last_price, 190.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_expires_lazily() {
        let cache = InMemoryCache::new();
        let symbol = Symbol::new("AAPL");

        cache.put_quote(&symbol, &quote("AAPL", 190.0)).await.unwrap();
        tokio::time::advance(DEFAULT_QUOTE_TTL).await;

        // Still held until someone looks at it
        assert_eq!(cache.len().await, 1);
        assert!(cache.get_quote(&symbol).await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_overwrite_resets_age() {
        let cache = InMemoryCache::with_ttl(Duration::from_secs(10));
        let symbol = Symbol::new("MSFT");

        cache.put_quote(&symbol, &quote("MSFT", 400.0)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put_quote(&symbol, &quote("MSFT", 401.0)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        let cached = cache.get_quote(&symbol).await.unwrap().unwrap();
        assert_eq!(cached.last_price, 401.0);
    }

    #[tokio::test]
    async fn test_memory_cache_invalidate_single_then_all() {
        let cache = InMemoryCache::new();
        let aapl = Symbol::new("AAPL");
        let msft = Symbol::new("MSFT");
        let goog = Symbol::new("GOOG");

        for symbol in [&aapl, &msft, &goog] {
            cache.put_quote(symbol, &quote(symbol.as_str(), 1.0)).await.unwrap();
        }

        assert!(cache.invalidate(&aapl).await.unwrap());
        assert!(!cache.invalidate(&aapl).await.unwrap());
        assert!(cache.get_quote(&aapl).await.unwrap().is_none());
        assert!(cache.get_quote(&msft).await.unwrap().is_some());

        cache.clear().await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_cache_invalidate_stale() {
        let cache = InMemoryCache::with_ttl(Duration::from_secs(60));

        cache.put_quote(&Symbol::new("OLD"), &quote("OLD", 1.0)).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.put_quote(&Symbol::new("NEW"), &quote("NEW", 2.0)).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(cache.invalidate_stale().await.unwrap(), 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get_quote(&Symbol::new("NEW")).await.unwrap().is_some());
    }
}
