// src/error.rs

//! Unified error handling for the crawler application.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error
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

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Fatal error raised before any crawl work starts
    #[error("Setup error: {0}")]
    Setup(String),

    /// Edge store failure that could not be absorbed
    #[error(transparent)]
    Store(#[from] StoreError),
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

    /// Create a setup error.
    pub fn setup(message: impl fmt::Display) -> Self {
        Self::Setup(message.to_string())
    }
}

/// Failure of a single fetch attempt.
///
/// Every variant is retried until the item's budget is spent; only then
/// does the URL count as a permanent failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response (connection, timeout, body read)
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status
    #[error("{url} answered HTTP status {status}")]
    Status { url: String, status: u16 },

    /// The response was not a document links can be extracted from
    #[error("{url} returned unusable content: {reason}")]
    Content { url: String, reason: String },
}

impl FetchError {
    pub fn request(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Request {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    pub fn content(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Content {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Request { url, .. } | Self::Status { url, .. } | Self::Content { url, .. } => url,
        }
    }

    /// The failure without the URL, for summaries keyed by URL.
    pub fn reason(&self) -> String {
        match self {
            Self::Request { reason, .. } | Self::Content { reason, .. } => reason.clone(),
            Self::Status { status, .. } => format!("HTTP status {status}"),
        }
    }
}

/// Failure of the durable edge store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
