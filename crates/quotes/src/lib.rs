#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Quote aggregation proxy.
//!
//! This crate re-exports the core types and provider implementations, and
//! provides a [`QuoteAggregator`] that owns the quote cache, the shared rate
//! limiter and the ordered provider chain.
//!
//! # Features
//!
//! - `finnhub` - Finnhub quotes, profiles and symbol search
//! - `yahoo` - Yahoo Finance chart quotes
//! - `fmp` - Financial Modeling Prep quotes and profiles
//! - `alltick` - AllTick batched quotes

// Core types and traits
pub use quotes_core::*;

// Cache implementations
pub use quotes_cache::{InMemoryCache, NoopCache};

// Providers
#[cfg(feature = "alltick")]
pub use quotes_alltick::AllTickProvider;
#[cfg(feature = "finnhub")]
pub use quotes_finnhub::FinnhubProvider;
#[cfg(feature = "fmp")]
pub use quotes_fmp::FmpProvider;
#[cfg(feature = "yahoo")]
pub use quotes_yahoo::YahooProvider;

mod aggregator;
mod config;
pub use aggregator::{PROBE_SYMBOL, ProviderStatus, QuoteAggregator};
pub use config::AggregatorConfig;
