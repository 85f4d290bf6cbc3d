#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quotes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching implementations for the quote aggregation proxy.
//!
//! This crate provides implementations of the [`QuoteCache`] trait from `quotes-core`:
//!
//! - [`InMemoryCache`] - Process-local TTL cache (default)
//! - [`NoopCache`] - No-op cache that doesn't store anything
//!
//! Quotes are never persisted; they lose reliability within minutes anyway.

/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;

// Re-export the trait for convenience
pub use quotes_core::QuoteCache;

// Re-export implementations
pub use memory::InMemoryCache;
pub use noop::NoopCache;
