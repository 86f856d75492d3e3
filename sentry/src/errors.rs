//! Error types for TailSentry

use thiserror::Error;

/// Main error type for the TailSentry agent
#[derive(Error, Debug)]
pub enum SentryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("tailscale binary not found: {0}")]
    BinaryNotFound(String),

    #[error("tailscale exited with code {code}: {stderr}")]
    CliError { code: i32, stderr: String },

    #[error("failed to parse tailscale output: {0}")]
    ParseError(String),

    #[error("invalid argument: {0}")]
    ValidationError(String),

    #[error("command timed out after {0} seconds")]
    TimeoutError(u64),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SentryError {
    /// Short machine-readable kind, used by the HTTP layer in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SentryError::IoError(_) => "io",
            SentryError::JsonError(_) => "json",
            SentryError::HttpError(_) => "http",
            SentryError::BinaryNotFound(_) => "binary_not_found",
            SentryError::CliError { .. } => "cli",
            SentryError::ParseError(_) => "parse",
            SentryError::ValidationError(_) => "validation",
            SentryError::TimeoutError(_) => "timeout",
            SentryError::ApiError(_) => "api",
            SentryError::ConfigError(_) => "config",
            SentryError::ServerError(_) => "server",
            SentryError::ShutdownError(_) => "shutdown",
            SentryError::Internal(_) => "internal",
        }
    }
}

impl From<anyhow::Error> for SentryError {
    fn from(err: anyhow::Error) -> Self {
        SentryError::Internal(err.to_string())
    }
}
