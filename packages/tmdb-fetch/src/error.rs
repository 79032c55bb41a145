//! Error types for the fetch pipeline.
//!
//! Most failures in the pipeline are soft: transport failures in particular
//! are logged, reported as events, and leave the in-flight record partially
//! filled.
//! The variants here cover what a caller must actually handle.

use thiserror::Error;

/// Pipeline-wide error type.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Invalid fetcher configuration (empty API key, unparsable base URL, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local filesystem failure (poster directory, poster file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The pipeline was cancelled while a request or backoff was pending.
    #[error("Fetch pipeline cancelled")]
    Cancelled,
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FetchError = io.into();
        assert!(matches!(err, FetchError::Io(_)));
        assert_eq!(err.to_string(), "IO error: gone");
    }

    #[test]
    fn test_cancelled_message() {
        assert_eq!(FetchError::Cancelled.to_string(), "Fetch pipeline cancelled");
    }
}
