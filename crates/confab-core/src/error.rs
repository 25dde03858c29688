//! Error types for the Confab SDK.

use thiserror::Error;

/// Result type alias using the SDK's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Confab operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failed before a response was produced
    #[error("Request error: {0}")]
    Request(String),

    /// Server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Encryption service (KMS) call failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
