//! No-op cache implementation.

use async_trait::async_trait;
use quotes_core::{Quote, QuoteCache, Result, Symbol};
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// Every lookup misses and every write is discarded, so each request walks
/// the provider chain. Useful for diagnosing providers without cache hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QuoteCache for NoopCache {
    async fn get_quote(&self, _symbol: &Symbol) -> Result<Option<Quote>> {
        trace!("NoopCache: get_quote called, returning None");
        Ok(None)
    }

    async fn put_quote(&self, _symbol: &Symbol, _quote: &Quote) -> Result<()> {
        trace!("NoopCache: put_quote called, doing nothing");
        Ok(())
    }

    async fn invalidate(&self, _symbol: &Symbol) -> Result<bool> {
        Ok(false)
    }

    async fn invalidate_stale(&self) -> Result<usize> {
        trace!("NoopCache: invalidate_stale called, returning 0");
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}
