#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! AllTick data provider.
//!
//! AllTick takes a JSON body listing exchange-qualified symbols (`AAPL.US`)
//! and answers with `{"code": 0, "data": [...]}`. Numeric fields may arrive
//! as JSON numbers or as strings.

use async_trait::async_trait;
use chrono::Utc;
use quotes_core::{
    DEFAULT_REQUEST_TIMEOUT, DataError, DataProvider, Quote, QuoteProvider, QuoteSource,
    RateLimiter, Result, Symbol,
};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Base URL for the AllTick quote API.
const ALLTICK_BASE_URL: &str = "https://quote-api.alltick.co";

/// Exchange suffix for US listings.
const US_SUFFIX: &str = ".US";

/// Fields requested for every quote.
const FIELD_LIST: [&str; 11] = [
    "last_price",
    "open",
    "high",
    "low",
    "volume",
    "change",
    "change_ratio",
    "timestamp",
    "prev_close",
    "market_cap",
    "pe_ratio",
];

/// AllTick quote provider.
#[derive(Clone)]
pub struct AllTickProvider {
    client: Client,
    token: Option<String>,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl fmt::Debug for AllTickProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllTickProvider")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AllTickProvider {
    /// Create a new AllTick provider with the given API token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self::with_client(client, Some(token.into()), Arc::new(RateLimiter::default()))
    }

    /// Create a new AllTick provider sharing a client and rate limiter.
    #[must_use]
    pub fn with_client(client: Client, token: Option<String>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            token,
            base_url: ALLTICK_BASE_URL.to_string(),
            limiter,
        }
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request_quotes(&self, symbols: &[Symbol]) -> Result<Vec<Quote>> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| DataError::MissingCredential(self.name().to_string()))?;

        let request = QuoteRequest {
            trace: format!("quote_{}", Utc::now().timestamp_millis()),
            data: QuoteRequestData {
                symbol_list: symbols
                    .iter()
                    .map(|s| format!("{}{US_SUFFIX}", s.as_str()))
                    .collect(),
                field_list: FIELD_LIST.to_vec(),
            },
        };

        self.limiter.acquire(self.source()).await;
        debug!(symbol_count = symbols.len(), "AllTick quote request");

        let response = self
            .client
            .post(format!("{}/quote", self.base_url))
            .header("token", token)
            .json(&request)
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
            return Err(DataError::Network(format!("HTTP {}", response.status())));
        }

        let body: QuoteResponse = response
            .json()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))?;

        if body.code != 0 {
            return Err(DataError::Other(format!(
                "AllTick code {}: {}",
                body.code,
                body.msg.unwrap_or_default()
            )));
        }

        Ok(body
            .data
            .unwrap_or_default()
            .into_iter()
            .map(AllTickQuote::into_quote)
            .filter(Quote::is_valid)
            .collect())
    }
}

impl DataProvider for AllTickProvider {
    fn source(&self) -> QuoteSource {
        QuoteSource::AllTick
    }

    fn description(&self) -> &str {
        "AllTick - batched US equity quotes"
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait]
impl QuoteProvider for AllTickProvider {
    async fn fetch_quote(&self, symbol: &Symbol) -> Option<Quote> {
        self.fetch_quotes(std::slice::from_ref(symbol))
            .await
            .into_iter()
            .find(|q| &q.ticker == symbol)
    }

    async fn fetch_quotes(&self, symbols: &[Symbol]) -> Vec<Quote> {
        if symbols.is_empty() {
            return Vec::new();
        }
        match self.request_quotes(symbols).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(
                    provider = self.name(),
                    symbol_count = symbols.len(),
                    error = %e,
                    "Quote request failed"
                );
                Vec::new()
            }
        }
    }
}

// ============================================================================
// AllTick API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct QuoteRequest {
    trace: String,
    data: QuoteRequestData,
}

#[derive(Debug, Serialize)]
struct QuoteRequestData {
    symbol_list: Vec<String>,
    field_list: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Vec<AllTickQuote>>,
}

#[derive(Debug, Deserialize)]
struct AllTickQuote {
    symbol: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    last_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    open: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    high: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    low: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    volume: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    change: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    change_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    prev_close: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    market_cap: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pe_ratio: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    timestamp: f64,
}

impl AllTickQuote {
    fn into_quote(self) -> Quote {
        let ticker = self
            .symbol
            .strip_suffix(US_SUFFIX)
            .unwrap_or(&self.symbol)
            .to_string();

        let mut quote = Quote {
            last_price: self.last_price,
            open: self.open,
            high: self.high,
            low: self.low,
            previous_close: self.prev_close,
            volume: self.volume.max(0.0) as u64,
            market_cap: self.market_cap,
            pe_ratio: self.pe_ratio,
            ..Quote::new(Symbol::new(ticker), QuoteSource::AllTick)
        };

        match (self.change, self.change_ratio) {
            (Some(change), Some(change_percent)) => {
                quote.change = change;
                quote.change_percent = change_percent;
            }
            _ => quote = quote.with_computed_change(),
        }

        if self.timestamp > 0.0 {
            quote.timestamp = self.timestamp as i64;
        }
        quote
    }
}

/// Accepts a JSON number, a numeric string, or null; anything unusable is zero.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_f64(deserializer)?.unwrap_or_default())
}

/// Like [`lenient_f64`], but keeps "not reported" distinct from zero.
fn lenient_opt_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    Ok(
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(NumberOrString::Number(n)) => Some(n),
            Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
            None => None,
        },
    )
}
