/// Centralized error types for the Kite futures utility
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KiteError {
    // Network Errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Broker-reported failures: bad checksum, expired/reused request token,
    // missing market-data entitlement
    #[error("Broker API error ({error_type}): {message}")]
    Broker { error_type: String, message: String },

    #[error("Kite credentials not configured")]
    Unconfigured,

    // Data Errors
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parse failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Config(String),

    // File I/O Errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KiteError>;
