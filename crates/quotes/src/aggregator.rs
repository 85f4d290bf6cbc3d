//! Quote aggregator: cache-first lookups with ordered provider fallback.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use quotes_cache::{InMemoryCache, NoopCache};
use quotes_core::{
    CompanyProfile, DataError, ProfileProvider, Quote, QuoteCache, QuoteProvider, QuoteSource,
    RateLimiter, Result, Symbol, SymbolMatch, SymbolSearchProvider,
};

use crate::config::AggregatorConfig;

/// Ticker used by [`QuoteAggregator::probe_providers`].
pub const PROBE_SYMBOL: &str = "AAPL";

/// Outcome of probing one quote provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    /// Provider identity.
    pub source: QuoteSource,
    /// Whether the provider has its credential.
    pub configured: bool,
    /// Whether the probe returned a valid quote.
    pub ok: bool,
}

/// Owns the quote cache and the ordered provider chains.
///
/// Quote providers are tried in registration order until one returns a quote
/// with a positive price. Successful quotes are written through to the cache.
///
/// # Example
///
/// ```rust,ignore
/// use quotes::{AggregatorConfig, QuoteAggregator};
///
/// let aggregator = QuoteAggregator::from_config(&AggregatorConfig::from_env()?)?;
/// if let Some(quote) = aggregator.get_quote("GOOG").await? {
///     println!("{} {} ({})", quote.ticker, quote.last_price, quote.source);
/// }
/// ```
pub struct QuoteAggregator {
    quote_providers: Vec<Arc<dyn QuoteProvider>>,
    profile_providers: Vec<Arc<dyn ProfileProvider>>,
    search_providers: Vec<Arc<dyn SymbolSearchProvider>>,
    cache: Arc<dyn QuoteCache>,
    only_provider: Option<QuoteSource>,
}

impl std::fmt::Debug for QuoteAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteAggregator")
            .field(
                "quote_providers",
                &self
                    .quote_providers
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "profile_providers",
                &self
                    .profile_providers
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "search_providers",
                &self
                    .search_providers
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .field("only_provider", &self.only_provider)
            .finish()
    }
}

impl QuoteAggregator {
    /// Create an aggregator with no providers around the given cache.
    #[must_use]
    pub fn new(cache: Arc<dyn QuoteCache>) -> Self {
        Self {
            quote_providers: Vec::new(),
            profile_providers: Vec::new(),
            search_providers: Vec::new(),
            cache,
            only_provider: None,
        }
    }

    /// Build the full provider chain from configuration.
    ///
    /// All adapters share one HTTP client and one rate limiter. Providers
    /// without a credential are registered anyway and logged.
    pub fn from_config(config: &AggregatorConfig) -> Result<Self> {
        let cache: Arc<dyn QuoteCache> = if config.cache_enabled {
            Arc::new(InMemoryCache::with_ttl(config.cache_ttl))
        } else {
            Arc::new(NoopCache::new())
        };

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DataError::Config(format!("HTTP client: {e}")))?;
        let limiter = Arc::new(RateLimiter::new(config.min_spacing));

        #[allow(unused_mut)]
        let mut aggregator = Self::new(cache);

        #[cfg(feature = "finnhub")]
        {
            let provider = Arc::new(quotes_finnhub::FinnhubProvider::with_client(
                client.clone(),
                config.finnhub_api_key.clone(),
                limiter.clone(),
            ));
            aggregator.register_quote(provider.clone());
            aggregator.register_profile(provider.clone());
            aggregator.register_search(provider);
        }

        #[cfg(feature = "yahoo")]
        aggregator.register_quote(Arc::new(quotes_yahoo::YahooProvider::with_client(
            client.clone(),
            limiter.clone(),
        )));

        #[cfg(feature = "fmp")]
        {
            let provider = Arc::new(quotes_fmp::FmpProvider::with_client(
                client.clone(),
                config.fmp_api_key.clone(),
                limiter.clone(),
            ));
            aggregator.register_quote(provider.clone());
            aggregator.register_profile(provider);
        }

        #[cfg(feature = "alltick")]
        aggregator.register_quote(Arc::new(quotes_alltick::AllTickProvider::with_client(
            client,
            config.alltick_api_token.clone(),
            limiter,
        )));

        for provider in &aggregator.quote_providers {
            if !provider.is_configured() {
                warn!(provider = provider.name(), "API credential not set; provider will fail");
            }
        }

        if let Some(source) = config.only_provider {
            aggregator = aggregator.with_only_provider(source);
        }

        Ok(aggregator)
    }

    /// Register a quote provider at the end of the fallback chain.
    pub fn register_quote(&mut self, provider: Arc<dyn QuoteProvider>) {
        debug!(provider = provider.name(), "Registering quote provider");
        self.quote_providers.push(provider);
    }

    /// Register a company profile provider.
    pub fn register_profile(&mut self, provider: Arc<dyn ProfileProvider>) {
        debug!(provider = provider.name(), "Registering profile provider");
        self.profile_providers.push(provider);
    }

    /// Register a symbol search provider.
    pub fn register_search(&mut self, provider: Arc<dyn SymbolSearchProvider>) {
        debug!(provider = provider.name(), "Registering search provider");
        self.search_providers.push(provider);
    }

    /// Restrict quote lookups to a single provider.
    #[must_use]
    pub fn with_only_provider(mut self, source: QuoteSource) -> Self {
        info!(provider = source.name(), "Quote chain restricted to one provider");
        self.only_provider = Some(source);
        self
    }

    fn quote_chain(&self) -> Result<Vec<&Arc<dyn QuoteProvider>>> {
        let chain: Vec<_> = self
            .quote_providers
            .iter()
            .filter(|p| self.only_provider.is_none_or(|only| p.source() == only))
            .collect();

        if chain.is_empty() {
            return Err(DataError::ProviderNotConfigured(
                "No quote providers registered".to_string(),
            ));
        }
        Ok(chain)
    }

    async fn store(&self, quote: &Quote) {
        if let Err(e) = self.cache.put_quote(&quote.ticker, quote).await {
            warn!(symbol = %quote.ticker, error = %e, "Failed to cache quote");
        }
    }

    /// Fetch a quote, trying the cache and then each provider in order.
    ///
    /// Returns `Ok(None)` when every provider comes back empty.
    pub async fn get_quote(&self, ticker: &str) -> Result<Option<Quote>> {
        let symbol = Symbol::parse(ticker)?;

        if let Some(cached) = self.cache.get_quote(&symbol).await? {
            debug!(symbol = %symbol, source = %cached.source, "Cache hit");
            return Ok(Some(cached));
        }

        for provider in self.quote_chain()? {
            debug!(provider = provider.name(), symbol = %symbol, "Fetching quote");

            match provider.fetch_quote(&symbol).await {
                Some(quote) if quote.is_valid() => {
                    let quote = Quote {
                        ticker: symbol.clone(),
                        ..quote
                    };
                    self.store(&quote).await;
                    return Ok(Some(quote));
                }
                _ => debug!(provider = provider.name(), symbol = %symbol, "No quote, trying next"),
            }
        }

        warn!(symbol = %symbol, "All providers exhausted");
        Ok(None)
    }

    /// Fetch quotes for many tickers.
    ///
    /// Tickers are trimmed, uppercased and deduplicated; blank or malformed
    /// entries are skipped. Cache misses go to one provider at a time as a
    /// whole batch: the first provider returning anything wins, and tickers it
    /// did not resolve are left out rather than retried further down the chain.
    ///
    /// Output follows input order. A cached quote takes precedence over a
    /// freshly fetched one for the same ticker.
    pub async fn get_bulk_quotes<S: AsRef<str>>(&self, tickers: &[S]) -> Result<Vec<Quote>> {
        let symbols = clean_tickers(tickers);

        let mut cached = HashMap::new();
        let mut to_fetch = Vec::new();
        for symbol in &symbols {
            match self.cache.get_quote(symbol).await? {
                Some(quote) => {
                    cached.insert(symbol.clone(), quote);
                }
                None => to_fetch.push(symbol.clone()),
            }
        }

        debug!(
            hits = cached.len(),
            misses = to_fetch.len(),
            "Partitioned bulk request"
        );

        let mut fetched = Vec::new();
        if !to_fetch.is_empty() {
            for provider in self.quote_chain()? {
                debug!(
                    provider = provider.name(),
                    symbol_count = to_fetch.len(),
                    "Fetching bulk quotes"
                );

                let quotes: Vec<Quote> = provider
                    .fetch_quotes(&to_fetch)
                    .await
                    .into_iter()
                    .filter(Quote::is_valid)
                    .collect();

                if !quotes.is_empty() {
                    for quote in quotes {
                        // An entry written while we were fetching wins over ours.
                        match self.cache.get_quote(&quote.ticker).await? {
                            Some(current) => {
                                cached.insert(quote.ticker.clone(), current);
                            }
                            None => {
                                self.store(&quote).await;
                                fetched.push(quote);
                            }
                        }
                    }
                    break;
                }
                debug!(provider = provider.name(), "Empty bulk result, trying next");
            }
        }

        Ok(merge_quotes(&symbols, cached, fetched))
    }

    /// Drop one ticker from the cache, or everything when `ticker` is `None`.
    pub async fn clear_cache(&self, ticker: Option<&str>) -> Result<()> {
        match ticker {
            Some(ticker) => {
                let symbol = Symbol::parse(ticker)?;
                self.cache.invalidate(&symbol).await?;
            }
            None => self.cache.clear().await?,
        }
        Ok(())
    }

    /// Eagerly remove every expired cache entry.
    pub async fn evict_stale(&self) -> Result<usize> {
        self.cache.invalidate_stale().await
    }

    /// Search symbols with the first registered search provider.
    pub async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.search_providers.first().ok_or_else(|| {
            DataError::ProviderNotConfigured("No search providers registered".to_string())
        })?;

        Ok(provider.search_symbols(query).await)
    }

    /// Fetch a company profile, trying profile providers in order.
    pub async fn company_profile(&self, ticker: &str) -> Result<Option<CompanyProfile>> {
        let symbol = Symbol::parse(ticker)?;

        for provider in self.profile_chain()? {
            if let Some(profile) = provider.company_profile(&symbol).await {
                return Ok(Some(profile));
            }
            debug!(provider = provider.name(), symbol = %symbol, "No profile, trying next");
        }

        Ok(None)
    }

    /// Fetch profiles for many tickers.
    ///
    /// The first provider is asked for everything; each later provider is only
    /// asked for the tickers still missing. Output follows input order.
    pub async fn company_profiles<S: AsRef<str>>(
        &self,
        tickers: &[S],
    ) -> Result<Vec<CompanyProfile>> {
        let symbols = clean_tickers(tickers);
        let mut found: HashMap<Symbol, CompanyProfile> = HashMap::new();

        for provider in self.profile_chain()? {
            let missing: Vec<Symbol> = symbols
                .iter()
                .filter(|s| !found.contains_key(*s))
                .cloned()
                .collect();
            if missing.is_empty() {
                break;
            }

            for profile in provider.company_profiles(&missing).await {
                found.entry(profile.symbol.clone()).or_insert(profile);
            }
        }

        Ok(symbols.iter().filter_map(|s| found.remove(s)).collect())
    }

    fn profile_chain(&self) -> Result<&[Arc<dyn ProfileProvider>]> {
        if self.profile_providers.is_empty() {
            return Err(DataError::ProviderNotConfigured(
                "No profile providers registered".to_string(),
            ));
        }
        Ok(&self.profile_providers)
    }

    /// Ask every registered quote provider for [`PROBE_SYMBOL`], bypassing the cache.
    pub async fn probe_providers(&self) -> Vec<ProviderStatus> {
        let symbol = Symbol::new(PROBE_SYMBOL);

        join_all(self.quote_providers.iter().map(|provider| {
            let symbol = &symbol;
            async move {
                let ok = provider
                    .fetch_quote(symbol)
                    .await
                    .is_some_and(|q| q.is_valid());
                ProviderStatus {
                    source: provider.source(),
                    configured: provider.is_configured(),
                    ok,
                }
            }
        }))
        .await
    }
}

/// Trim, uppercase and deduplicate tickers, keeping first occurrences.
fn clean_tickers<S: AsRef<str>>(tickers: &[S]) -> Vec<Symbol> {
    let mut seen = HashSet::new();
    tickers
        .iter()
        .map(AsRef::as_ref)
        .filter(|t| !t.trim().is_empty())
        .filter_map(|t| match Symbol::parse(t) {
            Ok(symbol) => Some(symbol),
            Err(e) => {
                warn!(error = %e, "Skipping ticker");
                None
            }
        })
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

/// Merge cache hits with fetched quotes in request order.
///
/// Each ticker appears once; cached quotes win. Fetched quotes for tickers
/// that were not requested come last.
fn merge_quotes(
    requested: &[Symbol],
    mut cached: HashMap<Symbol, Quote>,
    fetched: Vec<Quote>,
) -> Vec<Quote> {
    let mut fetched_by_symbol: HashMap<Symbol, Quote> = HashMap::new();
    let mut extra = Vec::new();
    let wanted: HashSet<&Symbol> = requested.iter().collect();

    for quote in fetched {
        if wanted.contains(&quote.ticker) {
            fetched_by_symbol.entry(quote.ticker.clone()).or_insert(quote);
        } else if !extra.iter().any(|q: &Quote| q.ticker == quote.ticker) {
            extra.push(quote);
        }
    }

    let mut merged: Vec<Quote> = requested
        .iter()
        .filter_map(|s| cached.remove(s).or_else(|| fetched_by_symbol.remove(s)))
        .collect();
    merged.extend(extra);
    merged
}
