//! Error types for control client operations

use thiserror::Error;

use crate::streaming::StreamError;

/// Result type alias for control client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during control client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Daemon returned an error response
    #[error("Daemon error {status}: {message}")]
    Daemon { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// No usable control endpoint could be resolved
    #[error("No usable control endpoint: {0}")]
    Resolve(String),

    /// Feed transport or setup error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// A cached singleton failure from an earlier initialization attempt
    #[error("Initialization failed: {0}")]
    Init(String),
}

impl ClientError {
    /// Create a daemon error from status code and message
    pub fn daemon_error(status: u16, message: impl Into<String>) -> Self {
        Self::Daemon {
            status,
            message: message.into(),
        }
    }
}
