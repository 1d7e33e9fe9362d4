//! Exchange error types.

use thiserror::Error;

/// Errors from exchange calls.
///
/// Everything except `HttpClient` and `Attestation` is transient: the
/// quoting loop retries on its own schedule and never crashes on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    #[error("Order attestation failed: {0}")]
    Attestation(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl ExchangeError {
    /// Check if the error is recovered by a fixed-delay retry.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::HttpClient(_) | Self::Attestation(_))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_builder() {
            Self::HttpClient(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
