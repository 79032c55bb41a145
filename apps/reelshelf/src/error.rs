//! Application error types for the reelshelf CLI.

use thiserror::Error;
use tmdb_fetch::FetchError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading/parsing errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Errors raised by the fetch pipeline
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Report or poster directory IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid invocation or missing required settings
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::BadRequest(_) | AppError::Config(_) => 2,
            AppError::Fetch(FetchError::Cancelled) => 130,
            _ => 1,
        }
    }
}

/// Result type alias for application operations
pub type Result<T> = std::result::Result<T, AppError>;
