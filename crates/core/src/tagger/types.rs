//! Metadata tagging trait and errors.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for tagging operations.
#[derive(Debug, Error)]
pub enum TagError {
    /// Downloading the cover art failed.
    #[error("Failed to fetch cover art from '{url}': {detail}")]
    CoverFetch { url: String, detail: String },

    /// Reading or writing the audio file's tags failed.
    #[error("Tagging failed: {0}")]
    Audio(#[from] lofty::error::LoftyError),

    /// IO failure around the audio file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes title, artist, and cover art into a downloaded audio file.
#[async_trait]
pub trait CoverTagger: Send + Sync {
    /// Tag the file at `path`. A missing `cover_url` skips the picture but
    /// still writes title and artist.
    async fn tag(
        &self,
        path: &Path,
        artist: &str,
        title: &str,
        cover_url: Option<&str>,
    ) -> Result<(), TagError>;
}
