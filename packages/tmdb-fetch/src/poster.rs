//! Poster storage.

use reqwest::Url;
use std::path::{Path, PathBuf};

use crate::endpoint::file_name;
use crate::error::Result;

/// Writes downloaded posters into a directory.
///
/// Files are named after the last path segment of the download URL and
/// written verbatim; an existing file with the same name is overwritten.
#[derive(Debug, Clone)]
pub struct PosterStore {
    dir: PathBuf,
}

impl PosterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local path a poster downloaded from `url` is stored at.
    pub fn path_for(&self, url: &Url) -> Option<PathBuf> {
        file_name(url).map(|name| self.dir.join(name))
    }

    /// Write poster bytes, creating the directory if needed.
    pub async fn save(&self, url: &Url, bytes: &[u8]) -> Result<Option<PathBuf>> {
        let Some(path) = self.path_for(url) else {
            tracing::warn!(url = %url, "Poster URL has no file name, not saving");
            return Ok(None);
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Poster written");
        Ok(Some(path))
    }
}
