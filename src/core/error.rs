//! Custom error types for Datalyst
//!
//! Provides a unified error handling system across all modules.

use std::time::Duration;

use thiserror::Error;

/// Main error type for Datalyst operations
#[derive(Error, Debug)]
pub enum DatalystError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Context-server runtime not installed
    #[error("'{0}' not found in PATH. Install Node.js to run the context server")]
    RuntimeNotFound(String),

    /// Context-server script missing
    #[error("Context server script not found at '{0}'. Run: npm install @zeddotdev/postgres-context-server")]
    ScriptNotFound(String),

    /// Channel initialization handshake failed
    #[error("Channel handshake failed: {0}")]
    Handshake(String),

    /// Operation attempted before connect()
    #[error("Channel is not connected")]
    NotConnected,

    /// Subprocess exited or the channel broke mid-session
    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    /// No response frame arrived within the channel timeout
    #[error("Channel request timed out after {0:?}")]
    Timeout(Duration),

    /// Error reported by the context server itself
    #[error("Context server error: {0}")]
    Server(String),

    /// Other channel-level faults
    #[error("Channel error: {0}")]
    Channel(String),

    /// Model invocation failure
    #[error("Model error: {0}")]
    Model(String),

    /// Agent loop exceeded its tool-call budget
    #[error("Agent exceeded the tool-call turn limit of {0}")]
    TurnLimit(usize),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for Datalyst operations
pub type Result<T> = std::result::Result<T, DatalystError>;

impl DatalystError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a channel error
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create a connection-lost error
    pub fn connection_lost(msg: impl Into<String>) -> Self {
        Self::ConnectionLost(msg.into())
    }

    /// Create a server error
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Whether this error should abort startup rather than be retried
    pub fn is_fatal_startup(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::RuntimeNotFound(_) | Self::ScriptNotFound(_) | Self::Handshake(_)
        )
    }
}
