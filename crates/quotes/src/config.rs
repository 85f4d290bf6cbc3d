//! Environment-driven aggregator configuration.

use std::fmt;
use std::time::Duration;

use quotes_core::{
    DEFAULT_MIN_SPACING, DEFAULT_QUOTE_TTL, DEFAULT_REQUEST_TIMEOUT, QuoteSource, Result,
};
use tracing::warn;

/// Settings for building a [`QuoteAggregator`](crate::QuoteAggregator).
///
/// Missing credentials are not an error; the affected provider stays in the
/// chain and fails at call time.
#[derive(Clone)]
pub struct AggregatorConfig {
    /// Finnhub API key (`FINNHUB_API_KEY`).
    pub finnhub_api_key: Option<String>,
    /// Financial Modeling Prep API key (`FMP_API_KEY`).
    pub fmp_api_key: Option<String>,
    /// AllTick API token (`ALLTICK_API_TOKEN`).
    pub alltick_api_token: Option<String>,
    /// Quote cache TTL (`QUOTES_CACHE_TTL_SECS`).
    pub cache_ttl: Duration,
    /// Whether quotes are cached at all (`QUOTES_CACHE_ENABLED`).
    pub cache_enabled: bool,
    /// Minimum spacing between calls to one provider (`QUOTES_MIN_SPACING_MS`).
    pub min_spacing: Duration,
    /// Per-request HTTP timeout (`QUOTES_REQUEST_TIMEOUT_SECS`).
    pub request_timeout: Duration,
    /// Restrict the quote chain to one provider (`QUOTES_ONLY_PROVIDER`).
    pub only_provider: Option<QuoteSource>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: None,
            fmp_api_key: None,
            alltick_api_token: None,
            cache_ttl: DEFAULT_QUOTE_TTL,
            cache_enabled: true,
            min_spacing: DEFAULT_MIN_SPACING,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            only_provider: None,
        }
    }
}

impl fmt::Debug for AggregatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AggregatorConfig")
            .field("finnhub_api_key", &redact(&self.finnhub_api_key))
            .field("fmp_api_key", &redact(&self.fmp_api_key))
            .field("alltick_api_token", &redact(&self.alltick_api_token))
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_enabled", &self.cache_enabled)
            .field("min_spacing", &self.min_spacing)
            .field("request_timeout", &self.request_timeout)
            .field("only_provider", &self.only_provider)
            .finish()
    }
}

impl AggregatorConfig {
    /// Load configuration from the process environment, honouring a `.env` file.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Unparseable numeric values fall back to their defaults with a warning;
    /// an unknown `QUOTES_ONLY_PROVIDER` is a configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let only_provider = var("QUOTES_ONLY_PROVIDER")
            .map(|v| v.parse::<QuoteSource>())
            .transpose()?;

        Ok(Self {
            finnhub_api_key: var("FINNHUB_API_KEY"),
            fmp_api_key: var("FMP_API_KEY"),
            alltick_api_token: var("ALLTICK_API_TOKEN"),
            cache_ttl: Duration::from_secs(env_var_parse(
                &var,
                "QUOTES_CACHE_TTL_SECS",
                DEFAULT_QUOTE_TTL.as_secs(),
            )),
            cache_enabled: env_var_bool(&var, "QUOTES_CACHE_ENABLED", true),
            min_spacing: Duration::from_millis(env_var_parse(
                &var,
                "QUOTES_MIN_SPACING_MS",
                DEFAULT_MIN_SPACING.as_millis() as u64,
            )),
            request_timeout: Duration::from_secs(env_var_parse(
                &var,
                "QUOTES_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
            )),
            only_provider,
        })
    }
}

fn env_var_parse<T, F>(var: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparseable setting");
            default
        }),
        None => default,
    }
}

fn env_var_bool<F>(var: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}
