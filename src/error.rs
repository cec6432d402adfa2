// src/error.rs

//! Unified error handling for the schedule watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or used
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Schedule page could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Schedule page could not be interpreted
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Snapshot persistence failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Notification delivery failed
    #[error("Notification error: {0}")]
    Notify(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a notification delivery error.
    pub fn notify(message: impl fmt::Display) -> Self {
        Self::Notify(message.to_string())
    }
}

/// Reasons a fetch of the upstream page can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request did not complete within the deadline
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The server answered with a non-success status
    #[error("Failed to fetch schedule: {status} {reason}")]
    HttpStatus { status: u16, reason: String },

    /// Connection, TLS or body decoding failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The body is below the plausibility floor
    #[error("Empty or invalid HTML response ({len} chars, expected at least {min})")]
    TooSmall { len: usize, min: usize },

    /// Direct access and every alternative path failed
    #[error("All {} access paths failed: {}", .attempts.len(), summarize_attempts(.attempts))]
    AllAlternativesExhausted { attempts: Vec<(String, FetchError)> },
}

impl FetchError {
    /// Stable reason tag for reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::HttpStatus { .. } => "http-status",
            Self::Transport(_) => "transport",
            Self::TooSmall { .. } => "too-small",
            Self::AllAlternativesExhausted { .. } => "all-alternatives-exhausted",
        }
    }
}

fn summarize_attempts(attempts: &[(String, FetchError)]) -> String {
    attempts
        .iter()
        .map(|(path, err)| format!("{path}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reasons a fetched document cannot be turned into a schedule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input is not an HTML document at all
    #[error("Unparseable document: {0}")]
    UnparseableDocument(String),
}

/// Snapshot store failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Failed to read '{key}': {message}")]
    ReadFailed { key: String, message: String },

    #[error("Failed to write '{key}': {message}")]
    WriteFailed { key: String, message: String },
}

impl StorageError {
    pub fn read(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ReadFailed {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn write(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::WriteFailed {
            key: key.into(),
            message: message.to_string(),
        }
    }
}
