//! Error types for the webarc CLI
//!
//! User-facing errors with actionable messages.

use thiserror::Error;
use webarc_engine::error::{CacheBuildError, EngineError};

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Archive node communication failed
    #[error("Server error: {0}. Ensure the archive node is running and --server-url points at it.")]
    Api(String),

    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// No record could be read at the given position
    #[error("No record at {file}:{offset}: {reason}")]
    RecordNotFound {
        file: String,
        offset: u64,
        reason: String,
    },

    /// A batch run finished with failures
    #[error("Batch finished with failures: {0}. See the exceptions listed above.")]
    BatchFailed(String),

    /// Index artifact could not be produced
    #[error("Index error: {0}. Remove stale '.working' markers in the cache directory if no build is running.")]
    Index(#[from] CacheBuildError),

    /// Engine operation failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Command arguments are inconsistent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your network connection and server URL.")]
    Http(#[from] reqwest::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables.")]
    Config(String),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
