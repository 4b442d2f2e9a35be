//! Search stage trait and errors.

use async_trait::async_trait;
use thiserror::Error;

/// Error type for search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The search returned no watchable result.
    #[error("No result found for '{query}'")]
    NoResults { query: String },

    /// YouTube refused without authentication (age gate, bot check).
    #[error("Access restricted by YouTube ({detail}). Provide account cookies via the SPOOTY_YOUTUBE_COOKIES env var or the youtube.cookies_file config entry")]
    AccessRestricted { detail: String },

    /// yt-dlp could not solve YouTube's signature challenge.
    #[error("YouTube signature challenge failed ({detail}). Updating yt-dlp usually resolves this")]
    ChallengeSolving { detail: String },

    /// The yt-dlp binary could not be spawned.
    #[error("yt-dlp not found at '{path}'. Install yt-dlp or set youtube.ytdlp_path")]
    ToolNotFound { path: String },

    /// yt-dlp exited unsuccessfully for another reason.
    #[error("yt-dlp search failed: {detail}")]
    Process { detail: String },

    /// IO failure around the subprocess.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves a track to a source watch URL.
#[async_trait]
pub trait TrackSearcher: Send + Sync {
    async fn search(&self, artist: &str, name: &str) -> Result<String, SearchError>;
}
