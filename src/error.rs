// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for the seitti prober
//!
//! Covers transport, configuration and I/O failures only. The analysis
//! core never errors on malformed input: bad HTML degrades to an
//! `unknown` context and unparseable JavaScript degrades to an empty
//! analysis, per the scan-robustness contract.

use thiserror::Error;

/// Result type alias for seitti operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for seitti
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Target has no injectable surface (no query parameters, no forms)
    #[error("No injectable parameters in {0}")]
    NoParameters(String),

    /// Timeout
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        url: Option<String>,
    },

    /// Rate limited by the target
    #[error("Rate limited by {url}: retry after {retry_after_secs:?}s")]
    RateLimited {
        url: String,
        retry_after_secs: Option<u64>,
    },

    /// Configuration error (bad pattern table, bad flag combination)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pattern table entry failed to compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Scan was cancelled before completion
    #[error("Scan cancelled")]
    Cancelled,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a pattern compile error
    pub fn pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Pattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration_ms,
            url: None,
        }
    }

    /// Create a timeout error with URL
    pub fn timeout_with_url(
        operation: impl Into<String>,
        duration_ms: u64,
        url: impl Into<String>,
    ) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration_ms,
            url: Some(url.into()),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if this is recoverable (worth retrying on another worker)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::RateLimited { .. } | Error::Http(_)
        )
    }

    /// Get URL if available
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Timeout { url: Some(u), .. } => Some(u),
            Error::RateLimited { url, .. } => Some(url),
            Error::NoParameters(u) => Some(u),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
