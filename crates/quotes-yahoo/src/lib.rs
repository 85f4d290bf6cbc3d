#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data provider.
//!
//! This crate provides a Yahoo Finance quote provider that implements the
//! [`DataProvider`] and [`QuoteProvider`] traits from `quotes-core`.
//!
//! # Features
//!
//! - Real-time quote from the chart API's `meta` block
//! - `change`/`changePercent` computed locally (the API omits them)
//! - Shared per-provider rate limiting
//! - Concurrent bulk fetch (no native bulk endpoint)
//!
//! # Example
//!
//! ```no_run
//! use quotes_yahoo::YahooProvider;
//! use quotes_core::{QuoteProvider, Symbol};
//!
//! # async fn example() {
//! let provider = YahooProvider::new();
//! if let Some(quote) = provider.fetch_quote(&Symbol::new("AAPL")).await {
//!     println!("{} {}", quote.ticker, quote.last_price);
//! }
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quotes_core::{
    DEFAULT_REQUEST_TIMEOUT, DataError, DataProvider, Quote, QuoteProvider, QuoteSource,
    RateLimiter, Result, Symbol,
};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

/// Yahoo Finance API base URL.
const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Yahoo Finance data provider.
///
/// Implements [`DataProvider`] and [`QuoteProvider`].
#[derive(Debug, Clone)]
pub struct YahooProvider {
    client: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a new Yahoo Finance provider with a custom request timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self::with_client(client, Arc::new(RateLimiter::default()))
    }

    /// Create a new Yahoo Finance provider sharing a client and rate limiter.
    ///
    /// The user agent is sent per request, so any client works.
    #[must_use]
    pub fn with_client(client: Client, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            base_url: YAHOO_BASE_URL.to_string(),
            limiter,
        }
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the chart API URL for today's session.
    ///
    /// The symbol is appended as an encoded path segment.
    fn build_chart_url(&self, symbol: &Symbol) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| DataError::InvalidParameter(format!("base URL {}: {e}", self.base_url)))?;

        url.path_segments_mut()
            .map_err(|()| {
                DataError::InvalidParameter(format!("base URL {} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol.as_str()]);
        url.query_pairs_mut()
            .append_pair("range", "1d")
            .append_pair("interval", "1d");

        Ok(url)
    }

    async fn request_quote(&self, symbol: &Symbol) -> Result<Quote> {
        self.limiter.acquire(self.source()).await;

        let url = self.build_chart_url(symbol)?;
        debug!("Fetching quote: {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| DataError::transport(self.name(), e.is_timeout(), e))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                provider: self.name().to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(DataError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        let chart_response: ChartResponse = response
            .json()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))?;

        // Check for API-level errors
        if let Some(error) = chart_response.chart.error {
            if error.code == "Not Found" {
                return Err(DataError::SymbolNotFound(symbol.to_string()));
            }
            return Err(DataError::Other(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        parse_chart_response(symbol, chart_response.chart.result)
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for YahooProvider {
    fn source(&self) -> QuoteSource {
        QuoteSource::YahooFinance
    }

    fn description(&self) -> &str {
        "Yahoo Finance chart API quotes"
    }
}

#[async_trait]
impl QuoteProvider for YahooProvider {
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

/// Map the first chart result into a quote.
///
/// The chart API has no change fields, so they are derived from the previous close.
fn parse_chart_response(symbol: &Symbol, results: Option<Vec<ChartData>>) -> Result<Quote> {
    let data = results
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;
    let meta = data.meta;

    let price = meta
        .regular_market_price
        .filter(|p| *p > 0.0)
        .ok_or_else(|| DataError::Parse(format!("no market price for {symbol}")))?;

    let open = data
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .and_then(|q| q.open.into_iter().flatten().next())
        .unwrap_or_default();

    let mut quote = Quote {
        last_price: price,
        open,
        high: meta.regular_market_day_high.unwrap_or_default(),
        low: meta.regular_market_day_low.unwrap_or_default(),
        previous_close: meta
            .previous_close
            .or(meta.chart_previous_close)
            .unwrap_or_default(),
        volume: meta.regular_market_volume.unwrap_or_default(),
        year_high: meta.fifty_two_week_high.unwrap_or_default(),
        year_low: meta.fifty_two_week_low.unwrap_or_default(),
        ..Quote::new(symbol.clone(), QuoteSource::YahooFinance)
    }
    .with_computed_change();

    if let Some(t) = meta.regular_market_time.filter(|t| *t > 0) {
        quote.timestamp = t;
    }

    Ok(quote)
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_volume: Option<u64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
}
