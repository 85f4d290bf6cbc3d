//! Cache trait for storing normalized quotes.
//!
//! This module defines the [`QuoteCache`] trait that provides a unified
//! interface for the time-bounded quote cache shared by every request.

use async_trait::async_trait;
use std::time::Duration;

use crate::{
    error::Result,
    types::{Quote, Symbol},
};

/// Default quote time-to-live (five minutes).
pub const DEFAULT_QUOTE_TTL: Duration = Duration::from_secs(300);

/// Trait for caching normalized quotes.
///
/// Implementations are process-wide shared state: every lookup and write goes
/// through the same instance, with last-writer-wins semantics per symbol.
#[async_trait]
pub trait QuoteCache: Send + Sync {
    /// Retrieves the cached quote for a symbol if present and unexpired.
    ///
    /// An expired entry is evicted and reported as `Ok(None)`.
    async fn get_quote(&self, symbol: &Symbol) -> Result<Option<Quote>>;

    /// Stores a quote, overwriting any existing entry and resetting its age.
    async fn put_quote(&self, symbol: &Symbol, quote: &Quote) -> Result<()>;

    /// Removes the entry for one symbol.
    ///
    /// Returns `true` if an entry was removed.
    async fn invalidate(&self, symbol: &Symbol) -> Result<bool>;

    /// Removes every expired entry.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self) -> Result<usize>;

    /// Clears all cached data.
    async fn clear(&self) -> Result<()>;
}
