//! Provider traits for fetching market data.
//!
//! This module defines the core provider traits:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`QuoteProvider`] - Real-time quotes, single and bulk
//! - [`ProfileProvider`] - Company profiles
//! - [`SymbolSearchProvider`] - Symbol search
//!
//! Providers are individually unreliable. Every fetch method therefore
//! returns `Option`/`Vec` rather than `Result`: transport failures, timeouts
//! and malformed payloads are logged by the adapter and surface as "absent".

use async_trait::async_trait;
use futures::future::join_all;
use std::fmt::Debug;
use std::time::Duration;

use crate::types::{CompanyProfile, Quote, QuoteSource, Symbol, SymbolMatch};

/// Default per-request timeout for outbound provider calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Base trait for all data providers.
///
/// All data providers must implement this trait to provide basic metadata
/// about the provider.
pub trait DataProvider: Send + Sync + Debug {
    /// Identity of this provider; also the rate limiter key.
    fn source(&self) -> QuoteSource;

    /// Returns the name of this provider (e.g., "Yahoo Finance").
    fn name(&self) -> &str {
        self.source().name()
    }

    /// Returns a description of this provider.
    fn description(&self) -> &str;

    /// Whether the provider has the credentials it needs.
    ///
    /// Unconfigured providers stay in the chain and fail at call time.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Provider for real-time quotes.
#[async_trait]
pub trait QuoteProvider: DataProvider {
    /// Fetches a normalized quote for a single symbol.
    ///
    /// Returns `None` on any failure, including a non-positive price.
    async fn fetch_quote(&self, symbol: &Symbol) -> Option<Quote>;

    /// Fetches quotes for multiple symbols.
    ///
    /// Default implementation issues one `fetch_quote` per symbol concurrently
    /// and keeps the valid results. Providers with a native bulk endpoint
    /// override this with a batched call.
    async fn fetch_quotes(&self, symbols: &[Symbol]) -> Vec<Quote> {
        join_all(symbols.iter().map(|symbol| self.fetch_quote(symbol)))
            .await
            .into_iter()
            .flatten()
            .filter(Quote::is_valid)
            .collect()
    }
}

/// Provider for company profiles.
#[async_trait]
pub trait ProfileProvider: DataProvider {
    /// Fetches the company profile for a symbol.
    async fn company_profile(&self, symbol: &Symbol) -> Option<CompanyProfile>;

    /// Fetches company profiles for multiple symbols concurrently.
    async fn company_profiles(&self, symbols: &[Symbol]) -> Vec<CompanyProfile> {
        join_all(symbols.iter().map(|symbol| self.company_profile(symbol)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Provider for symbol search.
#[async_trait]
pub trait SymbolSearchProvider: DataProvider {
    /// Searches symbols by ticker or company name.
    async fn search_symbols(&self, query: &str) -> Vec<SymbolMatch>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct FixedPrices(HashMap<&'static str, f64>);

    impl DataProvider for FixedPrices {
        fn source(&self) -> QuoteSource {
            QuoteSource::YahooFinance
        }

        fn description(&self) -> &str {
            "fixed prices"
        }
    }

    #[async_trait]
    impl QuoteProvider for FixedPrices {
        async fn fetch_quote(&self, symbol: &Symbol) -> Option<Quote> {
            let price = *self.0.get(symbol.as_str())?;
            Some(Quote {
                last_price: price,
                ..Quote::new(symbol.clone(), self.source())
            })
        }
    }

    #[tokio::test]
    async fn test_default_bulk_fetch_isolates_failures() {
        let provider = FixedPrices(HashMap::from([("AAPL", 190.0), ("ZERO", 0.0)]));
        let symbols = [Symbol::new("AAPL"), Symbol::new("MISSING"), Symbol::new("ZERO")];

        let quotes = provider.fetch_quotes(&symbols).await;

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].ticker.as_str(), "AAPL");
    }

    #[test]
    fn test_default_name_follows_source() {
        let provider = FixedPrices(HashMap::new());
        assert_eq!(provider.name(), "Yahoo Finance");
        assert!(provider.is_configured());
    }
}
