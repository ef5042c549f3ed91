//! Error types shared across webarc crates

use thiserror::Error;

/// Result type alias for webarc operations
pub type Result<T> = std::result::Result<T, WebarcError>;

/// Main error type for shared helpers
#[derive(Error, Debug)]
pub enum WebarcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
