//! Fetcher settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{FetchError, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://api.themoviedb.org/3";
/// Used for posters until the configuration request has answered.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/";
pub const DEFAULT_POSTER_SIZE: &str = "w396";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_BACKOFF_SECS: u64 = 10;
/// Shortest accepted rate-limit pause.
pub const MIN_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings for a [`MetadataFetcher`](crate::MetadataFetcher).
#[derive(Clone)]
pub struct FetcherConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub image_base_url: String,
    pub language: String,
    pub poster_size: String,
    pub poster_dir: PathBuf,
    /// Pause applied after a rate-limit response before the resend.
    pub backoff: Duration,
    pub request_timeout: Duration,
}

// Custom Debug implementation to avoid exposing api_key
impl std::fmt::Debug for FetcherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("image_base_url", &self.image_base_url)
            .field("language", &self.language)
            .field("poster_size", &self.poster_size)
            .field("poster_dir", &self.poster_dir)
            .field("backoff", &self.backoff)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl FetcherConfig {
    /// Create settings with defaults for everything but the API key.
    ///
    /// Returns an error if the API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(FetchError::Config(
                "TMDB API key cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            poster_size: DEFAULT_POSTER_SIZE.to_string(),
            poster_dir: PathBuf::from("./data/posters"),
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn image_base_url(mut self, url: impl Into<String>) -> Self {
        self.image_base_url = url.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn poster_size(mut self, size: impl Into<String>) -> Self {
        self.poster_size = size.into();
        self
    }

    pub fn poster_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.poster_dir = dir.into();
        self
    }

    /// Rate-limit pause. Values below [`MIN_BACKOFF`] are raised to it.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        if backoff < MIN_BACKOFF {
            tracing::warn!(
                requested_ms = backoff.as_millis() as u64,
                min_ms = MIN_BACKOFF.as_millis() as u64,
                "Rate-limit backoff too short, clamping"
            );
        }
        self.backoff = backoff.max(MIN_BACKOFF);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
