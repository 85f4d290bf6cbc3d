//! Core data types for real-time quotes.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`QuoteSource`] - Identity of the provider that produced a quote
//! - [`Quote`] - Canonical, provider-agnostic price quote
//! - [`SymbolMatch`] - Symbol search hit
//! - [`CompanyProfile`] - Company reference information

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// Longest ticker accepted by [`Symbol::parse`].
const MAX_SYMBOL_LEN: usize = 20;

/// A trading symbol/ticker.
///
/// Symbols are automatically trimmed and uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    ///
    /// No validation is performed; use [`Symbol::parse`] for caller input.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Parses and validates a ticker supplied by a caller.
    ///
    /// Accepts ASCII letters and digits plus `.`, `-`, `^`, `=` and `:`.
    pub fn parse(s: &str) -> Result<Self, DataError> {
        let trimmed = s.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= MAX_SYMBOL_LEN
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | ':'));

        if valid {
            Ok(Self::new(trimmed))
        } else {
            Err(DataError::InvalidSymbol(s.to_string()))
        }
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Identity of an upstream data provider.
///
/// Variants are declared in fallback priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuoteSource {
    /// Finnhub REST API.
    Finnhub,
    /// Yahoo Finance chart API.
    #[serde(rename = "Yahoo Finance")]
    YahooFinance,
    /// Financial Modeling Prep.
    #[serde(rename = "FMP")]
    Fmp,
    /// AllTick quote API.
    AllTick,
}

impl QuoteSource {
    /// All sources in fallback priority order.
    pub const ALL: [Self; 4] = [Self::Finnhub, Self::YahooFinance, Self::Fmp, Self::AllTick];

    /// Human readable provider name, as reported in [`Quote::source`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Finnhub => "Finnhub",
            Self::YahooFinance => "Yahoo Finance",
            Self::Fmp => "FMP",
            Self::AllTick => "AllTick",
        }
    }

    /// Short lowercase key used in configuration.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Finnhub => "finnhub",
            Self::YahooFinance => "yahoo",
            Self::Fmp => "fmp",
            Self::AllTick => "alltick",
        }
    }
}

impl fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QuoteSource {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|source| {
                source.key().eq_ignore_ascii_case(wanted)
                    || source.name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| DataError::Config(format!("unknown provider: {wanted}")))
    }
}

/// Computes `(change, change_percent)` from the last and previous close.
///
/// Both are zero when `previous_close` is zero.
#[must_use]
pub fn compute_change(last_price: f64, previous_close: f64) -> (f64, f64) {
    if previous_close == 0.0 {
        return (0.0, 0.0);
    }
    let change = last_price - previous_close;
    (change, change / previous_close * 100.0)
}

/// Canonical, provider-agnostic real-time quote.
///
/// Fields a provider does not report are zero, never absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Uppercase ticker; primary key for caching and merging.
    pub ticker: Symbol,
    /// Last traded price.
    pub last_price: f64,
    /// Session open.
    pub open: f64,
    /// Session high.
    pub high: f64,
    /// Session low.
    pub low: f64,
    /// Previous session close.
    pub previous_close: f64,
    /// `last_price - previous_close`.
    pub change: f64,
    /// `change` as a percentage of `previous_close`.
    pub change_percent: f64,
    /// Session volume.
    pub volume: u64,
    /// Market capitalization.
    pub market_cap: f64,
    /// Trailing price/earnings ratio.
    pub pe_ratio: f64,
    /// Trailing earnings per share.
    pub eps: f64,
    /// 52-week high.
    pub year_high: f64,
    /// 52-week low.
    pub year_low: f64,
    /// Provider-reported (or request-time) Unix epoch seconds.
    pub timestamp: i64,
    /// Wall-clock time the quote was normalized.
    pub last_update: DateTime<Utc>,
    /// Provider that produced this quote.
    pub source: QuoteSource,
}

impl Quote {
    /// Creates a quote with every numeric field zeroed and the timestamps set to now.
    #[must_use]
    pub fn new(ticker: Symbol, source: QuoteSource) -> Self {
        let now = Utc::now();
        Self {
            ticker,
            last_price: 0.0,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            previous_close: 0.0,
            change: 0.0,
            change_percent: 0.0,
            volume: 0,
            market_cap: 0.0,
            pe_ratio: 0.0,
            eps: 0.0,
            year_high: 0.0,
            year_low: 0.0,
            timestamp: now.timestamp(),
            last_update: now,
            source,
        }
    }

    /// Recomputes `change` and `change_percent` from `last_price` and `previous_close`.
    #[must_use]
    pub fn with_computed_change(mut self) -> Self {
        let (change, change_percent) = compute_change(self.last_price, self.previous_close);
        self.change = change;
        self.change_percent = change_percent;
        self
    }

    /// A quote is usable only when it carries a positive last price.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.last_price > 0.0
    }
}

/// A single symbol search hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
    /// Display symbol.
    pub symbol: String,
    /// Company or instrument name.
    pub name: String,
    /// Security type (e.g. "Common Stock").
    #[serde(rename = "type")]
    pub security_type: String,
    /// Short exchange name.
    #[serde(rename = "exchangeShortName")]
    pub exchange: String,
}

/// Company reference information.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Company name.
    pub name: String,
    /// Logo URL.
    pub logo: Option<String>,
    /// Country of incorporation.
    pub country: String,
    /// Trading currency.
    pub currency: String,
    /// Primary exchange.
    pub exchange: String,
    /// IPO date as reported by the provider.
    pub ipo: String,
    /// Market capitalization as reported by the provider.
    pub market_capitalization: f64,
    /// Shares outstanding.
    pub share_outstanding: f64,
    /// Company website.
    pub web_url: String,
    /// Industry classification.
    pub industry: String,
    /// Provider that produced this profile.
    pub source: QuoteSource,
}

impl CompanyProfile {
    /// Creates a profile with only the symbol and name set.
    #[must_use]
    pub fn new(symbol: Symbol, name: impl Into<String>, source: QuoteSource) -> Self {
        Self {
            symbol,
            name: name.into(),
            logo: None,
            country: String::new(),
            currency: String::new(),
            exchange: String::new(),
            ipo: String::new(),
            market_capitalization: 0.0,
            share_outstanding: 0.0,
            web_url: String::new(),
            industry: String::new(),
            source,
        }
    }

    /// Sets the logo URL.
    #[must_use]
    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalizes_case_and_whitespace() {
        assert_eq!(Symbol::new(" aapl ").as_str(), "AAPL");
        assert_eq!(Symbol::parse("brk.b").unwrap().as_str(), "BRK.B");
        assert_eq!("^gspc".parse::<Symbol>().unwrap().as_str(), "^GSPC");
    }

    #[test]
    fn test_symbol_parse_rejects_malformed_input() {
        assert!(matches!(Symbol::parse(""), Err(DataError::InvalidSymbol(_))));
        assert!(matches!(Symbol::parse("   "), Err(DataError::InvalidSymbol(_))));
        assert!(matches!(Symbol::parse("AA PL"), Err(DataError::InvalidSymbol(_))));
        assert!(matches!(Symbol::parse("AAPL;DROP"), Err(DataError::InvalidSymbol(_))));
        assert!(Symbol::parse(&"A".repeat(MAX_SYMBOL_LEN + 1)).is_err());
    }

    #[test]
    fn test_compute_change() {
        let (change, pct) = compute_change(142.50, 140.00);
        assert!((change - 2.50).abs() < 1e-9);
        assert!((pct - 1.785_714).abs() < 1e-4);

        assert_eq!(compute_change(10.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_quote_validity() {
        let mut quote = Quote::new(Symbol::new("GOOG"), QuoteSource::Finnhub);
        assert!(!quote.is_valid());

        quote.last_price = 0.01;
        assert!(quote.is_valid());

        quote.last_price = -1.0;
        assert!(!quote.is_valid());
    }

    #[test]
    fn test_quote_source_names_and_parsing() {
        assert_eq!(QuoteSource::YahooFinance.to_string(), "Yahoo Finance");
        assert_eq!("yahoo".parse::<QuoteSource>().unwrap(), QuoteSource::YahooFinance);
        assert_eq!("FMP".parse::<QuoteSource>().unwrap(), QuoteSource::Fmp);
        assert_eq!("AllTick".parse::<QuoteSource>().unwrap(), QuoteSource::AllTick);
        assert!("bloomberg".parse::<QuoteSource>().is_err());
    }

    #[test]
    fn test_quote_serializes_canonical_field_names() {
        let quote = Quote {
            last_price: 142.5,
            previous_close: 140.0,
            ..Quote::new(Symbol::new("GOOG"), QuoteSource::YahooFinance)
        }
        .with_computed_change();

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["ticker"], "GOOG");
        assert_eq!(json["lastPrice"], 142.5);
        assert_eq!(json["previousClose"], 140.0);
        assert_eq!(json["source"], "Yahoo Finance");
        assert!(json.get("changePercent").is_some());
    }
}
