#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Finnhub data provider.
//!
//! This crate implements the `quotes-core` provider traits for the
//! [Finnhub](https://finnhub.io/docs/api) API:
//!
//! - `/quote` - lightweight real-time quote (no volume, market cap or P/E)
//! - `/search` - symbol search, filtered to US listings
//! - `/stock/profile2` - company profile including logo
//!
//! Finnhub has no bulk quote endpoint, so bulk fetches fan out one request
//! per symbol concurrently, each gated by the shared [`RateLimiter`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use quotes_finnhub::FinnhubProvider;
//! use quotes_core::{QuoteProvider, Symbol};
//!
//! let provider = FinnhubProvider::new("your_api_key");
//! let quote = provider.fetch_quote(&Symbol::new("AAPL")).await;
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use quotes_core::{
    CompanyProfile, DEFAULT_REQUEST_TIMEOUT, DataError, DataProvider, ProfileProvider, Quote,
    QuoteProvider, QuoteSource, RateLimiter, Result, Symbol, SymbolMatch, SymbolSearchProvider,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Base URL for the Finnhub REST API.
const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Maximum number of symbol search results returned.
const MAX_SEARCH_RESULTS: usize = 15;

/// Longest symbol accepted as a US listing.
const MAX_US_SYMBOL_LEN: usize = 5;

/// Substrings that mark a non-US listing.
const FOREIGN_MARKERS: &[&str] = &[
    ".TO", ".L", ".SS", ".MC", ".AS", ".NE", ".HK", ".T", ".AX", ".JK", ".KL", ".PA", ".DE", ".MI",
    ".SW", ".V", "ZF",
];

/// Finnhub data provider.
///
/// Implements [`QuoteProvider`], [`ProfileProvider`] and [`SymbolSearchProvider`].
#[derive(Clone)]
pub struct FinnhubProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl fmt::Debug for FinnhubProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinnhubProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl FinnhubProvider {
    /// Create a new Finnhub provider with the given API key.
    ///
    /// Uses its own HTTP client and rate limiter.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self::with_client(client, Some(api_key.into()), Arc::new(RateLimiter::default()))
    }

    /// Create a new Finnhub provider sharing a client and rate limiter.
    ///
    /// A missing key is accepted; every call then fails and yields nothing.
    #[must_use]
    pub fn with_client(client: Client, api_key: Option<String>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            api_key,
            base_url: FINNHUB_BASE_URL.to_string(),
            limiter,
        }
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Make a rate-limited GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DataError::MissingCredential(self.name().to_string()))?;

        self.limiter.acquire(self.source()).await;
        debug!("Finnhub request: {} {:?}", endpoint, params);

        let response = self
            .client
            .get(format!("{}{endpoint}", self.base_url))
            .header("X-Finnhub-Token", api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| DataError::transport(self.name(), e.is_timeout(), e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DataError::RateLimited {
                provider: self.name().to_string(),
                retry_after: None,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DataError::MissingCredential(self.name().to_string()));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DataError::Network(format!("HTTP {status}: {text}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))
    }

    async fn request_quote(&self, symbol: &Symbol) -> Result<Quote> {
        let raw: FinnhubQuote = self.get("/quote", &[("symbol", symbol.as_str())]).await?;
        raw.into_quote(symbol)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
    }

    async fn request_profile(&self, symbol: &Symbol) -> Result<CompanyProfile> {
        let raw: FinnhubProfile = self
            .get("/stock/profile2", &[("symbol", symbol.as_str())])
            .await?;
        raw.into_profile(symbol)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
    }

    async fn request_search(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        let raw: FinnhubSearch = self.get("/search", &[("q", query)]).await?;
        Ok(filter_us_listings(raw.result))
    }
}

impl DataProvider for FinnhubProvider {
    fn source(&self) -> QuoteSource {
        QuoteSource::Finnhub
    }

    fn description(&self) -> &str {
        "Finnhub real-time quotes, symbol search and company profiles"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl QuoteProvider for FinnhubProvider {
    async fn fetch_quote(&self, symbol: &Symbol) -> Option<Quote> {
        match self.request_quote(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(provider = self.name(), symbol = %symbol, error = %e, "Quote unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl ProfileProvider for FinnhubProvider {
    async fn company_profile(&self, symbol: &Symbol) -> Option<CompanyProfile> {
        match self.request_profile(symbol).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(provider = self.name(), symbol = %symbol, error = %e, "Profile unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl SymbolSearchProvider for FinnhubProvider {
    async fn search_symbols(&self, query: &str) -> Vec<SymbolMatch> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match self.request_search(query).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(provider = self.name(), query, error = %e, "Symbol search failed");
                Vec::new()
            }
        }
    }
}

/// Whether a search hit looks like a plain US listing.
///
/// Share classes such as `BRK.B` are reported with the class suffix only
/// in the display symbol.
fn is_us_listing(symbol: &str, display_symbol: &str) -> bool {
    !symbol.is_empty()
        && !FOREIGN_MARKERS.iter().any(|marker| symbol.contains(marker))
        && (symbol == display_symbol || format!("{symbol}.B") == display_symbol)
        && symbol.len() <= MAX_US_SYMBOL_LEN
}

fn filter_us_listings(items: Vec<FinnhubSearchItem>) -> Vec<SymbolMatch> {
    items
        .into_iter()
        .filter(|item| is_us_listing(&item.symbol, item.display_symbol()))
        .take(MAX_SEARCH_RESULTS)
        .map(|item| SymbolMatch {
            symbol: item.display_symbol().to_string(),
            name: item.description,
            security_type: item.security_type,
            exchange: "US".to_string(),
        })
        .collect()
}

// ============================================================================
// Finnhub API Response Types
// ============================================================================

/// Response from `/quote`.
#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    /// Current price
    c: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close
    pc: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
}

impl FinnhubQuote {
    /// Unknown symbols come back as an all-zero payload.
    fn into_quote(self, symbol: &Symbol) -> Option<Quote> {
        let price = self.c.filter(|c| *c > 0.0)?;

        let mut quote = Quote {
            last_price: price,
            open: self.o.unwrap_or_default(),
            high: self.h.unwrap_or_default(),
            low: self.l.unwrap_or_default(),
            previous_close: self.pc.unwrap_or_default(),
            ..Quote::new(symbol.clone(), QuoteSource::Finnhub)
        }
        .with_computed_change();

        if let Some(t) = self.t.filter(|t| *t > 0) {
            quote.timestamp = t;
        }
        Some(quote)
    }
}

/// Response from `/search`.
#[derive(Debug, Deserialize)]
struct FinnhubSearch {
    #[serde(default)]
    result: Vec<FinnhubSearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinnhubSearchItem {
    #[serde(default)]
    description: String,
    #[serde(default)]
    display_symbol: Option<String>,
    #[serde(default)]
    symbol: String,
    #[serde(rename = "type", default)]
    security_type: String,
}

impl FinnhubSearchItem {
    fn display_symbol(&self) -> &str {
        self.display_symbol.as_deref().unwrap_or(&self.symbol)
    }
}

/// Response from `/stock/profile2`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FinnhubProfile {
    name: Option<String>,
    logo: Option<String>,
    country: Option<String>,
    currency: Option<String>,
    exchange: Option<String>,
    ipo: Option<String>,
    market_capitalization: Option<f64>,
    share_outstanding: Option<f64>,
    weburl: Option<String>,
    finnhub_industry: Option<String>,
}

impl FinnhubProfile {
    /// Finnhub answers unknown symbols with `{}`; a profile without a logo
    /// is treated as not found.
    fn into_profile(self, symbol: &Symbol) -> Option<CompanyProfile> {
        let logo = self.logo.filter(|logo| !logo.is_empty())?;

        Some(CompanyProfile {
            country: self.country.unwrap_or_default(),
            currency: self.currency.unwrap_or_default(),
            exchange: self.exchange.unwrap_or_default(),
            ipo: self.ipo.unwrap_or_default(),
            market_capitalization: self.market_capitalization.unwrap_or_default(),
            share_outstanding: self.share_outstanding.unwrap_or_default(),
            web_url: self.weburl.unwrap_or_default(),
            industry: self.finnhub_industry.unwrap_or_default(),
            ..CompanyProfile::new(
                symbol.clone(),
                self.name.unwrap_or_default(),
                QuoteSource::Finnhub,
            )
            .with_logo(logo)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn provider(server: &mockito::Server) -> FinnhubProvider {
        FinnhubProvider::new("test-key").with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_fetch_quote_normalizes_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/quote")
            .match_query(Matcher::UrlEncoded("symbol".into(), "AAPL".into()))
            .match_header("X-Finnhub-Token", "test-key")
            .with_header("content-type", "application/json")
            .with_body(r#"{"c":190.5,"d":0.5,"dp":0.26,"h":191.0,"l":188.0,"o":189.0,"pc":190.0,"t":1700000000}"#)
            .create_async()
            .await;

        let quote = provider(&server)
            .fetch_quote(&Symbol::new("aapl"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(quote.ticker.as_str(), "AAPL");
        assert_eq!(quote.last_price, 190.5);
        assert_eq!(quote.open, 189.0);
        assert_eq!(quote.previous_close, 190.0);
        assert!((quote.change - 0.5).abs() < 1e-9);
        assert_eq!(quote.timestamp, 1_700_000_000);
        assert_eq!(quote.source, QuoteSource::Finnhub);
        // Not reported by the lightweight quote endpoint
        assert_eq!(quote.volume, 0);
        assert_eq!(quote.market_cap, 0.0);
        assert_eq!(quote.pe_ratio, 0.0);
    }

    #[tokio::test]
    async fn test_fetch_quote_zero_price_is_absent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote")
            .match_query(Matcher::Any)
            .with_body(r#"{"c":0,"d":null,"dp":null,"h":0,"l":0,"o":0,"pc":0,"t":0}"#)
            .create_async()
            .await;

        assert!(provider(&server).fetch_quote(&Symbol::new("NOPE")).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_quote_http_error_is_absent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        assert!(provider(&server).fetch_quote(&Symbol::new("AAPL")).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/quote")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let provider = FinnhubProvider::with_client(
            Client::new(),
            None,
            Arc::new(RateLimiter::default()),
        )
        .with_base_url(server.url());

        assert!(!provider.is_configured());
        assert!(provider.fetch_quote(&Symbol::new("AAPL")).await.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bulk_fetch_fans_out_and_drops_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote")
            .match_query(Matcher::UrlEncoded("symbol".into(), "AAPL".into()))
            .with_body(r#"{"c":190.0,"h":0,"l":0,"o":0,"pc":189.0,"t":1700000000}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/quote")
            .match_query(Matcher::UrlEncoded("symbol".into(), "MSFT".into()))
            .with_body(r#"{"c":410.0,"h":0,"l":0,"o":0,"pc":400.0,"t":1700000000}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/quote")
            .match_query(Matcher::UrlEncoded("symbol".into(), "BAD".into()))
            .with_status(502)
            .create_async()
            .await;

        let symbols = [Symbol::new("AAPL"), Symbol::new("BAD"), Symbol::new("MSFT")];
        let mut quotes = provider(&server).fetch_quotes(&symbols).await;
        quotes.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].ticker.as_str(), "AAPL");
        assert_eq!(quotes[1].ticker.as_str(), "MSFT");
    }

    #[tokio::test]
    async fn test_search_filters_foreign_listings_and_caps_results() {
        let mut items: Vec<String> = vec![
            r#"{"description":"APPLE INC","displaySymbol":"AAPL","symbol":"AAPL","type":"Common Stock"}"#.into(),
            r#"{"description":"APPLE INC","displaySymbol":"AAPL.TO","symbol":"AAPL.TO","type":"Common Stock"}"#.into(),
            r#"{"description":"APPLE INC","displaySymbol":"APC.DE","symbol":"APC.DE","type":"Common Stock"}"#.into(),
            r#"{"description":"BERKSHIRE","displaySymbol":"BRK.B","symbol":"BRK","type":"Common Stock"}"#.into(),
            r#"{"description":"TOO LONG","displaySymbol":"ABCDEF","symbol":"ABCDEF","type":"Common Stock"}"#.into(),
        ];
        for i in 0..20 {
            items.push(format!(
                r#"{{"description":"FILLER {i}","displaySymbol":"F{i}","symbol":"F{i}","type":"Common Stock"}}"#
            ));
        }

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("q".into(), "apple".into()))
            .with_body(format!(r#"{{"count":{},"result":[{}]}}"#, items.len(), items.join(",")))
            .create_async()
            .await;

        let matches = provider(&server).search_symbols("  apple ").await;

        assert_eq!(matches.len(), MAX_SEARCH_RESULTS);
        assert_eq!(matches[0].symbol, "AAPL");
        assert_eq!(matches[0].exchange, "US");
        assert_eq!(matches[1].symbol, "BRK.B");
        assert!(matches.iter().all(|m| !m.symbol.contains(".TO") && !m.symbol.contains(".DE")));
        assert!(matches.iter().all(|m| m.symbol != "ABCDEF"));
    }

    #[tokio::test]
    async fn test_blank_search_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/search").expect(0).create_async().await;

        assert!(provider(&server).search_symbols("   ").await.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_profile_requires_logo() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/stock/profile2")
            .match_query(Matcher::UrlEncoded("symbol".into(), "AAPL".into()))
            .with_body(
                r#"{"country":"US","currency":"USD","exchange":"NASDAQ NMS - GLOBAL MARKET","ipo":"1980-12-12","logo":"https://static.finnhub.io/logo/aapl.png","marketCapitalization":2900000,"name":"Apple Inc","shareOutstanding":15500,"ticker":"AAPL","weburl":"https://www.apple.com/","finnhubIndustry":"Technology"}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/stock/profile2")
            .match_query(Matcher::UrlEncoded("symbol".into(), "ZZZZ".into()))
            .with_body("{}")
            .create_async()
            .await;

        let provider = provider(&server);
        let profile = provider.company_profile(&Symbol::new("AAPL")).await.unwrap();
        assert_eq!(profile.name, "Apple Inc");
        assert_eq!(profile.industry, "Technology");
        assert_eq!(profile.logo.as_deref(), Some("https://static.finnhub.io/logo/aapl.png"));

        assert!(provider.company_profile(&Symbol::new("ZZZZ")).await.is_none());
    }

    #[test]
    fn test_us_listing_rules() {
        assert!(is_us_listing("MSFT", "MSFT"));
        assert!(is_us_listing("BRK", "BRK.B"));
        assert!(!is_us_listing("SHOP.TO", "SHOP.TO"));
        assert!(!is_us_listing("ABCZF", "ABCZF"));
        assert!(!is_us_listing("", ""));
        assert!(!is_us_listing("GOOGL", "GOOG"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = FinnhubProvider::new("secret");
        let debug = format!("{provider:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
    }
}
