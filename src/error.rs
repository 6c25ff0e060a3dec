//! Error types for Converse
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! The variants encode the failure taxonomy the session loop relies on:
//! authentication and protocol violations terminate the process, while
//! rate limits, connection failures, and timeouts abort only the current
//! turn (the pending user message is rolled back).

use thiserror::Error;

/// Main error type for Converse operations
#[derive(Error, Debug)]
pub enum ConverseError {
    /// Configuration-related errors (missing file, bad key, invalid TOML)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication rejected by the completion provider (fatal)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Streaming protocol invariant violated (fatal for the turn)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Rate or quota limit exceeded (turn-recoverable)
    #[error("Rate limit or quota exceeded: {0}")]
    RateLimited(String),

    /// Connection to the provider failed (turn-recoverable)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Provider request timed out (turn-recoverable)
    #[error("Connection timed out: {0}")]
    Timeout(String),

    /// Session file errors (unreadable or malformed session files)
    #[error("Session file error: {0}")]
    Session(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ConverseError {
    /// True when this failure should abort only the current turn,
    /// rolling back the pending user message instead of exiting.
    pub fn is_turn_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Connection(_) | Self::Timeout(_)
        )
    }

    /// True when this failure must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::Protocol(_))
    }
}

/// Result type alias for Converse operations
///
/// Uses `anyhow::Error` as the error type, allowing rich context and easy
/// propagation while `ConverseError` carries the classification.
pub type Result<T> = anyhow::Result<T>;
