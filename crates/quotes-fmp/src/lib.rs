#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Financial Modeling Prep (FMP) data provider.
//!
//! This crate implements the `quotes-core` traits for the
//! [Financial Modeling Prep](https://financialmodelingprep.com/) API.
//! FMP has a native batch quote endpoint, so bulk fetches issue one call per
//! chunk of up to [`MAX_BATCH_SYMBOLS`] symbols instead of one per symbol.
//!
//! # Usage
//!
//! ```rust,ignore
//! use quotes_fmp::FmpProvider;
//! use quotes_core::{QuoteProvider, Symbol};
//!
//! let provider = FmpProvider::new("your_api_key");
//! let quotes = provider
//!     .fetch_quotes(&[Symbol::new("AAPL"), Symbol::new("MSFT")])
//!     .await;
//! ```

use async_trait::async_trait;
use quotes_core::{
    CompanyProfile, DEFAULT_REQUEST_TIMEOUT, DataError, DataProvider, ProfileProvider, Quote,
    QuoteProvider, QuoteSource, RateLimiter, Result, Symbol,
};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Base URL for the FMP stable API.
const FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";

/// Maximum symbols per batch quote request.
pub const MAX_BATCH_SYMBOLS: usize = 50;

/// Financial Modeling Prep data provider.
///
/// Provides access to:
/// - Real-time quotes, single and batched
/// - Company profiles
#[derive(Clone)]
pub struct FmpProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl fmt::Debug for FmpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmpProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl FmpProvider {
    /// Create a new FMP provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self::with_client(client, Some(api_key.into()), Arc::new(RateLimiter::default()))
    }

    /// Create a new FMP provider sharing a client and rate limiter.
    #[must_use]
    pub fn with_client(client: Client, api_key: Option<String>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            api_key,
            base_url: FMP_BASE_URL.to_string(),
            limiter,
        }
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build a URL with the API key appended.
    fn url(&self, endpoint: &str, api_key: &str) -> String {
        if endpoint.contains('?') {
            format!("{}/{endpoint}&apikey={api_key}", self.base_url)
        } else {
            format!("{}/{endpoint}?apikey={api_key}", self.base_url)
        }
    }

    /// Make a rate-limited GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DataError::MissingCredential(self.name().to_string()))?;

        self.limiter.acquire(self.source()).await;

        let url = self.url(endpoint, api_key);
        debug!("FMP request: {}", endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DataError::transport(self.name(), e.is_timeout(), e))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                provider: self.name().to_string(),
                retry_after: None,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DataError::Network(format!("HTTP {status}: {text}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        match serde_json::from_str::<FmpResponse<T>>(&text) {
            Ok(FmpResponse::Data(data)) => Ok(data),
            Ok(FmpResponse::Error(body)) => Err(DataError::Network(body.message)),
            Err(e) => Err(DataError::Parse(format!("{e}: {text}"))),
        }
    }

    /// Fetch one batch of quotes (at most [`MAX_BATCH_SYMBOLS`] symbols).
    async fn fetch_batch(&self, symbols: &[Symbol]) -> Result<Vec<Quote>> {
        let joined = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let raw: Vec<FmpQuote> = self.get(&format!("batch-quote?symbols={joined}")).await?;

        Ok(raw
            .into_iter()
            .map(FmpQuote::into_quote)
            .filter(Quote::is_valid)
            .collect())
    }

    async fn request_quote(&self, symbol: &Symbol) -> Result<Quote> {
        let raw: Vec<FmpQuote> = self
            .get(&format!("quote?symbol={}", symbol.as_str()))
            .await?;

        raw.into_iter()
            .next()
            .map(FmpQuote::into_quote)
            .filter(Quote::is_valid)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
    }

    async fn request_profile(&self, symbol: &Symbol) -> Result<CompanyProfile> {
        let profiles: Vec<FmpProfile> = self
            .get(&format!("profile?symbol={}", symbol.as_str()))
            .await?;

        profiles
            .into_iter()
            .next()
            .map(|p| p.into_profile(symbol))
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
    }
}

impl DataProvider for FmpProvider {
    fn source(&self) -> QuoteSource {
        QuoteSource::Fmp
    }

    fn description(&self) -> &str {
        "Financial Modeling Prep - Financial data and stock market API"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl QuoteProvider for FmpProvider {
    async fn fetch_quote(&self, symbol: &Symbol) -> Option<Quote> {
        match self.request_quote(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(provider = self.name(), symbol = %symbol, error = %e, "Quote unavailable");
                None
            }
        }
    }

    /// One batch request per chunk of symbols; a failed chunk yields nothing
    /// but does not abort the others.
    async fn fetch_quotes(&self, symbols: &[Symbol]) -> Vec<Quote> {
        let mut quotes = Vec::with_capacity(symbols.len());

        for chunk in symbols.chunks(MAX_BATCH_SYMBOLS) {
            match self.fetch_batch(chunk).await {
                Ok(batch) => quotes.extend(batch),
                Err(e) => {
                    warn!(
                        provider = self.name(),
                        symbol_count = chunk.len(),
                        error = %e,
                        "Batch quote request failed"
                    );
                }
            }
        }

        quotes
    }
}

#[async_trait]
impl ProfileProvider for FmpProvider {
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

// ============================================================================
// FMP API Response Types
// ============================================================================

/// FMP answers errors with HTTP 200 and an object body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FmpResponse<T> {
    Data(T),
    Error(FmpErrorBody),
}

#[derive(Debug, Deserialize)]
struct FmpErrorBody {
    #[serde(rename = "Error Message", alias = "error")]
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpQuote {
    symbol: String,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    day_high: Option<f64>,
    #[serde(default)]
    day_low: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    change: Option<f64>,
    #[serde(default, alias = "changesPercentage")]
    change_percentage: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    pe: Option<f64>,
    #[serde(default)]
    eps: Option<f64>,
    #[serde(default)]
    year_high: Option<f64>,
    #[serde(default)]
    year_low: Option<f64>,
    #[serde(default)]
    timestamp: Option<i64>,
}

impl FmpQuote {
    fn into_quote(self) -> Quote {
        let mut quote = Quote {
            last_price: self.price.unwrap_or_default(),
            open: self.open.unwrap_or_default(),
            high: self.day_high.unwrap_or_default(),
            low: self.day_low.unwrap_or_default(),
            previous_close: self.previous_close.unwrap_or_default(),
            volume: self.volume.unwrap_or_default().max(0.0) as u64,
            market_cap: self.market_cap.unwrap_or_default(),
            pe_ratio: self.pe.unwrap_or_default(),
            eps: self.eps.unwrap_or_default(),
            year_high: self.year_high.unwrap_or_default(),
            year_low: self.year_low.unwrap_or_default(),
            ..Quote::new(Symbol::new(self.symbol), QuoteSource::Fmp)
        };

        match (self.change, self.change_percentage) {
            (Some(change), Some(change_percent)) => {
                quote.change = change;
                quote.change_percent = change_percent;
            }
            _ => quote = quote.with_computed_change(),
        }

        if let Some(t) = self.timestamp.filter(|t| *t > 0) {
            quote.timestamp = t;
        }
        quote
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpProfile {
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default, alias = "exchangeShortName")]
    exchange: Option<String>,
    #[serde(default)]
    ipo_date: Option<String>,
    #[serde(default, alias = "mktCap")]
    market_cap: Option<f64>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    industry: Option<String>,
}

impl FmpProfile {
    fn into_profile(self, symbol: &Symbol) -> CompanyProfile {
        let mut profile = CompanyProfile {
            country: self.country.unwrap_or_default(),
            currency: self.currency.unwrap_or_default(),
            exchange: self.exchange.unwrap_or_default(),
            ipo: self.ipo_date.unwrap_or_default(),
            market_capitalization: self.market_cap.unwrap_or_default(),
            web_url: self.website.unwrap_or_default(),
            industry: self.industry.unwrap_or_default(),
            ..CompanyProfile::new(
                symbol.clone(),
                self.company_name.unwrap_or_default(),
                QuoteSource::Fmp,
            )
        };
        if let Some(image) = self.image.filter(|i| !i.is_empty()) {
            profile = profile.with_logo(image);
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn quote_json(symbol: &str, price: f64) -> String {
        format!(
            r#"{{"symbol":"{symbol}","name":"{symbol} Inc","price":{price},"changePercentage":1.5,"change":2.0,"volume":1000,"dayLow":1.0,"dayHigh":2.0,"yearHigh":3.0,"yearLow":0.5,"marketCap":1000000,"exchange":"NASDAQ","open":1.2,"previousClose":{prev},"timestamp":1700000000}}"#,
            prev = price - 2.0
        )
    }

    #[test]
    fn test_provider_creation() {
        let provider = FmpProvider::new("test_api_key");
        assert_eq!(provider.name(), "FMP");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_url_building() {
        let provider = FmpProvider::new("test_key");

        let url1 = provider.url("quote?symbol=AAPL", "test_key");
        assert!(url1.contains("apikey=test_key"));
        assert!(url1.contains("&apikey="));

        let url2 = provider.url("batch-quote", "test_key");
        assert!(url2.contains("?apikey=test_key"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = FmpProvider::new("secret_key_123");
        let debug_str = format!("{provider:?}");
        assert!(!debug_str.contains("secret_key_123"));
        assert!(debug_str.contains("REDACTED"));
    }

    #[test]
    fn test_legacy_field_names_and_missing_change() {
        let raw: FmpQuote = serde_json::from_str(
            r#"{"symbol":"aapl","price":110.0,"previousClose":100.0,"changesPercentage":null,"pe":28.1,"eps":6.4}"#,
        )
        .unwrap();
        let quote = raw.into_quote();

        assert_eq!(quote.ticker.as_str(), "AAPL");
        assert_eq!(quote.pe_ratio, 28.1);
        assert_eq!(quote.eps, 6.4);
        assert!((quote.change - 10.0).abs() < 1e-9);
        assert!((quote.change_percent - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_bulk_uses_single_batch_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/batch-quote")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbols".into(), "AAPL,MSFT,DEAD".into()),
                Matcher::UrlEncoded("apikey".into(), "k".into()),
            ]))
            .with_body(format!(
                "[{},{},{}]",
                quote_json("AAPL", 190.0),
                quote_json("MSFT", 410.0),
                quote_json("DEAD", 0.0)
            ))
            .expect(1)
            .create_async()
            .await;

        let provider = FmpProvider::new("k").with_base_url(server.url());
        let symbols = [Symbol::new("AAPL"), Symbol::new("MSFT"), Symbol::new("DEAD")];
        let quotes = provider.fetch_quotes(&symbols).await;

        mock.assert_async().await;
        assert_eq!(quotes.len(), 2);
        assert!(quotes.iter().all(|q| q.source == QuoteSource::Fmp));
        assert_eq!(quotes[0].change, 2.0);
        assert_eq!(quotes[0].change_percent, 1.5);
    }

    #[tokio::test]
    async fn test_large_bulk_is_chunked() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/batch-quote")
            .match_query(Matcher::Any)
            .with_body("[]")
            .expect(2)
            .create_async()
            .await;

        let provider = FmpProvider::new("k").with_base_url(server.url());
        let symbols: Vec<Symbol> = (0..MAX_BATCH_SYMBOLS + 1)
            .map(|i| Symbol::new(format!("T{i}")))
            .collect();

        assert!(provider.fetch_quotes(&symbols).await.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_null_fields_do_not_drop_batch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/batch-quote")
            .match_query(Matcher::Any)
            .with_body(format!(
                r#"[{},{{"symbol":"SPY","name":"SPDR S&P 500 ETF","price":512.3,"open":null,"dayHigh":null,"dayLow":null,"previousClose":510.0,"change":null,"changePercentage":null,"volume":null,"marketCap":null,"pe":null,"eps":null,"yearHigh":null,"yearLow":null,"timestamp":null}}]"#,
                quote_json("AAPL", 190.0)
            ))
            .create_async()
            .await;

        let provider = FmpProvider::new("k").with_base_url(server.url());
        let quotes = provider
            .fetch_quotes(&[Symbol::new("AAPL"), Symbol::new("SPY")])
            .await;

        assert_eq!(quotes.len(), 2);
        let spy = &quotes[1];
        assert_eq!(spy.ticker.as_str(), "SPY");
        assert_eq!(spy.market_cap, 0.0);
        assert_eq!(spy.volume, 0);
        assert!((spy.change - 2.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_error_word_in_data_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote")
            .match_query(Matcher::Any)
            .with_body(
                r#"[{"symbol":"ERR","name":"error","price":12.5,"previousClose":12.0,"exchange":"NYSE"}]"#,
            )
            .create_async()
            .await;

        let provider = FmpProvider::new("k").with_base_url(server.url());
        let quote = provider.fetch_quote(&Symbol::new("ERR")).await.unwrap();

        assert_eq!(quote.last_price, 12.5);
    }

    #[tokio::test]
    async fn test_error_message_payload_is_absent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote")
            .match_query(Matcher::Any)
            .with_body(r#"{"Error Message":"Invalid API KEY."}"#)
            .create_async()
            .await;

        let provider = FmpProvider::new("bad").with_base_url(server.url());
        assert!(provider.fetch_quote(&Symbol::new("AAPL")).await.is_none());
    }

    #[tokio::test]
    async fn test_profile_maps_image_to_logo() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/profile")
            .match_query(Matcher::UrlEncoded("symbol".into(), "AAPL".into()))
            .with_body(
                r#"[{"symbol":"AAPL","companyName":"Apple Inc.","image":"https://images.financialmodelingprep.com/symbol/AAPL.png","country":"US","currency":"USD","exchange":"NASDAQ","ipoDate":"1980-12-12","marketCap":3000000000000,"website":"https://www.apple.com","industry":"Consumer Electronics"}]"#,
            )
            .create_async()
            .await;

        let provider = FmpProvider::new("k").with_base_url(server.url());
        let profile = provider.company_profile(&Symbol::new("AAPL")).await.unwrap();

        assert_eq!(profile.name, "Apple Inc.");
        assert_eq!(profile.source, QuoteSource::Fmp);
        assert!(profile.logo.is_some());
        assert_eq!(profile.ipo, "1980-12-12");
    }
}
