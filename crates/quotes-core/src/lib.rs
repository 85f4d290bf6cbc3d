#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the quote aggregation proxy.
//!
//! This crate provides the foundational abstractions shared by every provider:
//!
//! - [`DataProvider`](provider::DataProvider) - Base trait for all providers
//! - [`QuoteProvider`](provider::QuoteProvider) - Real-time quotes, single and bulk
//! - [`ProfileProvider`](provider::ProfileProvider) - Company profiles
//! - [`SymbolSearchProvider`](provider::SymbolSearchProvider) - Symbol lookup
//! - [`QuoteCache`](cache::QuoteCache) - Caching abstraction
//! - [`RateLimiter`](rate_limit::RateLimiter) - Per-provider request spacing

/// Cache trait for storing normalized quotes.
pub mod cache;
/// Error types for data operations.
pub mod error;
/// Provider traits for fetching market data.
pub mod provider;
/// Per-provider request spacing.
pub mod rate_limit;
/// Core data types (Symbol, Quote, CompanyProfile, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{DEFAULT_QUOTE_TTL, QuoteCache};
pub use error::{DataError, Result};
pub use provider::{
    DEFAULT_REQUEST_TIMEOUT, DataProvider, ProfileProvider, QuoteProvider, SymbolSearchProvider,
};
pub use rate_limit::{DEFAULT_MIN_SPACING, RateLimiter};
pub use types::{CompanyProfile, Quote, QuoteSource, Symbol, SymbolMatch, compute_change};
