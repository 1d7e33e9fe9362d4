//! Vault error types.

use thiserror::Error;

/// Credential errors. Fatal for the affected agent only.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Failed to read wallet record {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed wallet record: {0}")]
    Malformed(String),

    #[error("Invalid encryption key")]
    InvalidKey,

    #[error("No encryption key: record has no embedded key and no external key source is configured")]
    MissingKey,

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decrypt field `{0}`")]
    Decryption(&'static str),

    #[error("Decrypted field `{0}` is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type VaultResult<T> = Result<T, VaultError>;
