//! Configuration module for reelshelf.
//!
//! Loads configuration from `reelshelf.toml` with environment variable overrides.

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tmdb_fetch::config::{
    DEFAULT_API_BASE_URL, DEFAULT_BACKOFF_SECS, DEFAULT_LANGUAGE, DEFAULT_POSTER_SIZE,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use tmdb_fetch::FetcherConfig;

use crate::error::AppError;

pub const DEFAULT_CONFIG_FILE: &str = "reelshelf.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// TMDB API configuration
#[derive(Clone, Deserialize)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_poster_size")]
    pub poster_size: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

// Custom Debug implementation to avoid exposing api_key
impl std::fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base_url", &self.api_base_url)
            .field("language", &self.language)
            .field("poster_size", &self.poster_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_api_base_url(),
            language: default_language(),
            poster_size: default_poster_size(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_poster_size() -> String {
    DEFAULT_POSTER_SIZE.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// How a candidate is picked out of search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Exact title match, then year, then first result
    #[default]
    Auto,
    /// Ask on the terminal
    Prompt,
    /// Always the first result
    First,
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SelectionMode::Auto => "auto",
            SelectionMode::Prompt => "prompt",
            SelectionMode::First => "first",
        };
        f.write_str(name)
    }
}

/// Fetch job configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_backoff")]
    pub rate_limit_backoff_secs: u64,
    #[serde(default = "default_poster_dir")]
    pub poster_dir: PathBuf,
    #[serde(default = "default_fetch_people")]
    pub fetch_people: bool,
    #[serde(default)]
    pub selection: SelectionMode,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            rate_limit_backoff_secs: default_backoff(),
            poster_dir: default_poster_dir(),
            fetch_people: default_fetch_people(),
            selection: SelectionMode::default(),
        }
    }
}

fn default_backoff() -> u64 {
    DEFAULT_BACKOFF_SECS
}

fn default_poster_dir() -> PathBuf {
    PathBuf::from("./data/posters")
}

fn default_fetch_people() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `reelshelf.toml` in current directory (optional)
    /// 3. Environment variables with `REELSHELF_` prefix
    ///
    /// Environment variables use double underscore for nesting:
    /// - `REELSHELF_TMDB__API_KEY=...` sets `tmdb.api_key`
    /// - `REELSHELF_FETCH__POSTER_DIR=/srv/posters` sets `fetch.poster_dir`
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(config_path: &str) -> Result<Self, AppError> {
        let config = ConfigLoader::builder()
            .set_default("tmdb.api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("tmdb.language", DEFAULT_LANGUAGE)?
            .set_default("tmdb.poster_size", DEFAULT_POSTER_SIZE)?
            .set_default("tmdb.request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .set_default("fetch.rate_limit_backoff_secs", DEFAULT_BACKOFF_SECS)?
            .set_default("fetch.poster_dir", "./data/posters")?
            .set_default("fetch.fetch_people", true)?
            .set_default("fetch.selection", "auto")?
            .add_source(File::with_name(config_path).required(false))
            // REELSHELF_FETCH__FETCH_PEOPLE=false -> fetch.fetch_people = false
            .add_source(
                Environment::with_prefix("REELSHELF")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for required fields.
    fn validate(&self) -> Result<(), AppError> {
        // A missing key only blocks running a job.
        if self.tmdb.api_key.is_none() {
            tracing::warn!("TMDB API key not configured - fetch jobs will be refused");
        }

        if self.fetch.rate_limit_backoff_secs == 0 {
            return Err(AppError::BadRequest(
                "fetch.rate_limit_backoff_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Settings for the fetch pipeline.
    ///
    /// Fails with `BadRequest` when no API key is configured.
    pub fn to_fetcher_config(&self) -> Result<FetcherConfig, AppError> {
        let api_key = self
            .tmdb
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::BadRequest(
                    "TMDB API key is not configured (set tmdb.api_key or REELSHELF_TMDB__API_KEY)"
                        .to_string(),
                )
            })?;

        Ok(FetcherConfig::new(api_key)?
            .api_base_url(self.tmdb.api_base_url.as_str())
            .language(self.tmdb.language.as_str())
            .poster_size(self.tmdb.poster_size.as_str())
            .poster_dir(self.fetch.poster_dir.clone())
            .backoff(Duration::from_secs(self.fetch.rate_limit_backoff_secs))
            .request_timeout(Duration::from_secs(self.tmdb.request_timeout_secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::load_from("nonexistent.toml").unwrap();
        assert_eq!(config.tmdb.api_base_url, "https://api.themoviedb.org/3");
        assert_eq!(config.tmdb.language, "en");
        assert_eq!(config.tmdb.poster_size, "w396");
        assert_eq!(config.tmdb.request_timeout_secs, 30);
        assert_eq!(config.fetch.poster_dir, PathBuf::from("./data/posters"));
    }

    #[test]
    fn test_fetch_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.rate_limit_backoff_secs, 10);
        assert!(config.fetch_people);
        assert_eq!(config.selection, SelectionMode::Auto);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[tmdb]
api_key = "file-key"
language = "fr"

[fetch]
poster_dir = "/tmp/posters"
fetch_people = false
selection = "first"
rate_limit_backoff_secs = 3
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.tmdb.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.tmdb.language, "fr");
        assert_eq!(config.tmdb.poster_size, "w396");
        assert_eq!(config.fetch.poster_dir, PathBuf::from("/tmp/posters"));
        assert!(!config.fetch.fetch_people);
        assert_eq!(config.fetch.selection, SelectionMode::First);

        let fetcher = config.to_fetcher_config().unwrap();
        assert_eq!(fetcher.api_key, "file-key");
        assert_eq!(fetcher.language, "fr");
        assert_eq!(fetcher.backoff, Duration::from_secs(3));
        assert_eq!(fetcher.poster_dir, PathBuf::from("/tmp/posters"));
    }

    #[test]
    fn test_missing_api_key_is_bad_request() {
        let config = Config {
            tmdb: TmdbConfig::default(),
            fetch: FetchConfig::default(),
        };
        assert!(matches!(
            config.to_fetcher_config(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let tmdb = TmdbConfig {
            api_key: Some("secret-key".to_string()),
            ..TmdbConfig::default()
        };
        let debug = format!("{:?}", tmdb);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
