//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Vault(#[from] mm_vault::VaultError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] mm_exchange::ExchangeError),

    #[error("Quote error: {0}")]
    Quote(#[from] mm_quote::QuoteError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] mm_telemetry::TelemetryError),

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
