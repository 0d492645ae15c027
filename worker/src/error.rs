//! Error types for the route engine and travel providers

use std::time::Duration;

use thiserror::Error;

/// Failure of a daily route computation as a whole.
///
/// Provider failures never surface here; they degrade individual segments.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid worker id '{0}': expected a UUID")]
    InvalidWorkerId(String),

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("data source failed: {0:#}")]
    Source(#[from] anyhow::Error),

    #[error("request was superseded or cancelled")]
    Cancelled,
}

impl RouteError {
    /// Error code used in NATS error replies.
    pub const fn code(&self) -> &'static str {
        match self {
            RouteError::InvalidWorkerId(_) | RouteError::InvalidDate(_) => "INVALID_INPUT",
            RouteError::Source(_) => "SOURCE_ERROR",
            RouteError::Cancelled => "CANCELLED",
        }
    }
}

/// Typed failure of a single travel-time lookup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider returned invalid data: {0}")]
    InvalidResponse(String),

    #[error("provider temporarily disabled (circuit breaker open)")]
    CircuitOpen,
}

impl ProviderError {
    /// Warning type attached to the affected segment.
    pub const fn warning_type(&self) -> &'static str {
        match self {
            ProviderError::Timeout(_) => "PROVIDER_TIMEOUT",
            ProviderError::Unavailable(_) => "PROVIDER_ERROR",
            ProviderError::InvalidResponse(_) => "PROVIDER_INVALID",
            ProviderError::CircuitOpen => "PROVIDER_UNAVAILABLE",
        }
    }
}
