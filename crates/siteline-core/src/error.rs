//! Error types for siteline-core

use thiserror::Error;

/// Result type alias using siteline-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in siteline-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server replied with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A sync pass is already running
    #[error("Sync already in progress")]
    SyncInProgress,

    /// No server connectivity
    #[error("Device is offline")]
    Offline,

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True when the error is worth retrying on a later sync pass.
    ///
    /// Transport failures and server 5xx/429 responses are transient.
    /// Validation failures and 4xx rejections are not: retrying them
    /// would fail the same way forever.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Offline | Self::SyncInProgress => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            _ => false,
        }
    }
}
