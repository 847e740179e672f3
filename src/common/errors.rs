//! Error types for the application

use thiserror::Error;

/// Result type alias using our TradingError
pub type Result<T> = std::result::Result<T, TradingError>;

/// Main error type for brokerage, oracle and trading operations
#[derive(Error, Debug)]
pub enum TradingError {
    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Non-success status returned by a remote API
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}, retry after {retry_after_seconds:?} seconds")]
    RateLimit {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ticker lookup returned no matching instrument
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    /// No usable brokerage account
    #[error("Account unavailable: {0}")]
    AccountUnavailable(String),

    /// Latest candle was missing or had zero volume/close
    #[error("No market data: {0}")]
    NoMarketData(String),

    /// The decision oracle answered with an error message
    #[error("Oracle rejected request {request_id}: {message}")]
    OracleRejected { request_id: u64, message: String },

    /// The brokerage refused or failed to execute an order
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// The action queue has been closed by the scheduler
    #[error("Action queue closed")]
    QueueClosed,

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Whether a retry of the same request could reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            TradingError::HttpRequest(e) => e.is_timeout() || e.is_connect(),
            TradingError::Api { status, .. } => *status >= 500,
            TradingError::RateLimit { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let server = TradingError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        let client = TradingError::Api {
            status: 400,
            message: "bad request".to_string(),
        };
        let limited = TradingError::RateLimit {
            message: "slow down".to_string(),
            retry_after_seconds: Some(1),
        };

        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(limited.is_transient());
        assert!(!TradingError::QueueClosed.is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = TradingError::OracleRejected {
            request_id: 7,
            message: "model not loaded".to_string(),
        };
        assert_eq!(err.to_string(), "Oracle rejected request 7: model not loaded");
    }
}
