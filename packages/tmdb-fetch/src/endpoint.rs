//! Endpoint templates for the five request types.
//!
//! An [`Endpoint`] fully determines its URL, so resending after a rate-limit
//! pause means building the same endpoint again.

use reqwest::Url;

use crate::config::FetcherConfig;
use crate::error::{FetchError, Result};

/// Request category. At most one request per category is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Movies,
    People,
    Posters,
}

/// One outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Service configuration, carries the poster base URL.
    Configuration,
    /// Free-text title search.
    Search { query: String },
    /// Movie detail with credits appended.
    Movie { id: i64 },
    /// Person detail.
    Person { id: i64 },
    /// Poster image for a relative path such as `/abc.jpg`.
    Poster { path: String },
}

impl Endpoint {
    pub fn category(&self) -> Category {
        match self {
            Self::Configuration | Self::Search { .. } | Self::Movie { .. } => Category::Movies,
            Self::Person { .. } => Category::People,
            Self::Poster { .. } => Category::Posters,
        }
    }

    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Search { .. } => "search",
            Self::Movie { .. } => "movie",
            Self::Person { .. } => "person",
            Self::Poster { .. } => "poster",
        }
    }

    /// Build the request URL.
    ///
    /// `image_base` is the poster base URL learned from the configuration
    /// request (or the default before that).
    pub fn url(&self, config: &FetcherConfig, image_base: &str) -> Result<Url> {
        let api = &config.api_base_url;
        let mut url = match self {
            Self::Configuration => parse(&format!("{}/configuration", api))?,
            Self::Search { .. } => parse(&format!("{}/search/movie", api))?,
            Self::Movie { id } => parse(&format!("{}/movie/{}", api, id))?,
            Self::Person { id } => parse(&format!("{}/person/{}", api, id))?,
            Self::Poster { path } => {
                let base = if image_base.ends_with('/') {
                    image_base.to_string()
                } else {
                    format!("{}/", image_base)
                };
                return parse(&format!("{}{}{}", base, config.poster_size, path));
            }
        };

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &config.api_key);
            match self {
                Self::Search { query: title } => {
                    query.append_pair("query", title);
                }
                Self::Movie { .. } => {
                    query.append_pair("append_to_response", "credits");
                    query.append_pair("language", &config.language);
                }
                _ => {}
            }
        }

        Ok(url)
    }
}

fn parse(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| FetchError::Config(format!("Invalid URL {}: {}", raw, e)))
}

/// Final path segment of a URL, percent-decoded, used as the poster file
/// name.
///
/// Segments that decode to something other than a plain file name
/// (`..`, or anything containing a path separator) yield `None`.
pub fn file_name(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let name = urlencoding::decode(segment).ok()?;

    let separator = |c: char| c == '/' || c == '\\';
    if name.is_empty() || name == "." || name == ".." || name.contains(separator) {
        return None;
    }
    Some(name.into_owned())
}
