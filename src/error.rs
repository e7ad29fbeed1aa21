//! Unified error types for the scanner bot.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the scanner bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catalog fetch/parse error.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Trading/order error.
    #[error("trading error: {0}")]
    Trading(#[from] TradingError),

    /// Exchange client error.
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Market catalog fetch and parse errors.
///
/// These are absorbed into empty results at the fetch layer after retries;
/// they surface only in logs.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// All retry attempts against the catalog endpoint failed.
    #[error("catalog fetch failed after {attempts} attempts: {reason}")]
    FetchExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last failure reason.
        reason: String,
    },

    /// Failed to parse catalog response body.
    #[error("failed to parse catalog response: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Order placement errors.
#[derive(Error, Debug)]
pub enum TradingError {
    /// No token id could be resolved for the target outcome.
    #[error("missing token id for market {market_id}")]
    MissingTokenId {
        /// Market the lookup failed for.
        market_id: String,
    },

    /// Order submission failed.
    #[error("order submission failed: {0}")]
    SubmissionFailed(String),

    /// Invalid order parameters.
    #[error("invalid order parameters: {0}")]
    InvalidParams(String),

    /// Order size below the exchange minimum, even after retry.
    #[error("order size {size} below exchange minimum {minimum}")]
    BelowMinimumSize {
        /// Requested size.
        size: Decimal,
        /// Exchange-reported minimum.
        minimum: Decimal,
    },
}

/// Exchange client errors.
///
/// Deliberately coarse: callers only distinguish "rejected with a reason we
/// can inspect" from everything else.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Order rejected by the exchange.
    #[error("order rejected: {reason}")]
    Rejected {
        /// Rejection reason text from the exchange.
        reason: String,
    },

    /// Authentication/signing failure.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Signing error.
    #[error("signing error: {0}")]
    Signing(String),

    /// Failed to parse an exchange response.
    #[error("failed to parse exchange response: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Endpoint returned a non-success status.
    #[error("exchange request failed: HTTP {status} - {body}")]
    BadStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

impl ExchangeError {
    /// Rejection reason text, if this error carries one.
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ExchangeError::Rejected { reason } => Some(reason),
            ExchangeError::BadStatus { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_reason_extraction() {
        let rejected = ExchangeError::Rejected {
            reason: "Size (5) lower than the minimum: 25".to_string(),
        };
        assert!(rejected.rejection_reason().unwrap().contains("minimum: 25"));

        let auth = ExchangeError::Auth("bad creds".to_string());
        assert!(auth.rejection_reason().is_none());
    }
}
