//! Error types for the timeline pipeline.

use thiserror::Error;

/// Main error type for timeline operations.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("No authenticated client available")]
    NoClientAvailable,

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Decoding failure: {0}")]
    Decoding(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown stream: {0}")]
    UnknownStream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid cache format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },
}

impl TimelineError {
    /// Whether the failure came from the network and may go away on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            TimelineError::Transport(_) => true,
            TimelineError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TimelineError {
    fn from(e: serde_json::Error) -> Self {
        TimelineError::Decoding(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for TimelineError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        TimelineError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for TimelineError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        TimelineError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for TimelineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TimelineError::Decoding(e.to_string())
        } else if let Some(status) = e.status() {
            TimelineError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            TimelineError::Transport(e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TimelineError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        TimelineError::Transport(e.to_string())
    }
}

impl From<url::ParseError> for TimelineError {
    fn from(e: url::ParseError) -> Self {
        TimelineError::InvalidUrl(e.to_string())
    }
}

/// Result type for timeline operations.
pub type Result<T> = std::result::Result<T, TimelineError>;
