//! Error types for data operations.
//!
//! This module defines [`DataError`] which covers all error cases that can occur
//! when fetching, parsing, or caching quotes. Provider adapters collapse these
//! into "absent" results at their public boundary; only input validation,
//! configuration and cache failures reach callers of the aggregator.

use thiserror::Error;

/// Errors that can occur during data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Network-related errors (connection failures, non-2xx responses, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The ticker supplied by the caller is malformed.
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// Error parsing data from a provider.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The requested provider is not configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// A provider was called without an API credential.
    #[error("Missing API credential for {0}")]
    MissingCredential(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid process configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl DataError {
    /// Maps a transport error from `reqwest`-style clients, keeping timeouts distinct.
    #[must_use]
    pub fn transport(provider: &str, is_timeout: bool, message: impl std::fmt::Display) -> Self {
        if is_timeout {
            Self::Timeout(provider.to_string())
        } else {
            Self::Network(format!("{provider}: {message}"))
        }
    }
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;
