//! Download stage traits and errors.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Error type for audio fetch operations.
///
/// The restricted/challenge variants carry actionable guidance because their
/// messages surface verbatim on failed tracks.
#[derive(Debug, Error)]
pub enum FetchError {
    /// YouTube refused without authentication (age gate, bot check).
    #[error("Access restricted by YouTube ({detail}). Provide account cookies via the SPOOTY_YOUTUBE_COOKIES env var or the youtube.cookies_file config entry")]
    AccessRestricted { detail: String },

    /// yt-dlp could not solve YouTube's signature challenge.
    #[error("YouTube signature challenge failed ({detail}). Updating yt-dlp usually resolves this")]
    ChallengeSolving { detail: String },

    /// The yt-dlp binary could not be spawned.
    #[error("yt-dlp not found at '{path}'. Install yt-dlp or set youtube.ytdlp_path")]
    ToolNotFound { path: String },

    /// The download exceeded the configured time limit.
    #[error("Download timed out after {ms}ms")]
    Timeout { ms: i64 },

    /// yt-dlp exited unsuccessfully for another reason.
    #[error("yt-dlp failed: {detail}")]
    Process { detail: String },

    /// IO failure around the subprocess.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a failing yt-dlp run was complaining about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    AccessRestricted,
    ChallengeSolving,
    Other,
}

/// Classify yt-dlp stderr output into a failure kind.
pub fn classify_stderr(stderr: &str) -> FailureKind {
    let lower = stderr.to_lowercase();

    const RESTRICTED: &[&str] = &[
        "sign in to confirm your age",
        "sign in to confirm you",
        "age-restricted",
        "age restricted",
        "login required",
        "not a bot",
        "use --cookies",
    ];
    if RESTRICTED.iter().any(|p| lower.contains(p)) {
        return FailureKind::AccessRestricted;
    }

    const CHALLENGE: &[&str] = &[
        "nsig extraction failed",
        "unable to extract signature",
        "signature extraction failed",
        "challenge",
        "player response",
    ];
    if CHALLENGE.iter().any(|p| lower.contains(p)) {
        return FailureKind::ChallengeSolving;
    }

    FailureKind::Other
}

/// Condense stderr into the most relevant line for an error message.
pub fn stderr_summary(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
        .to_string()
}

/// Receives download progress percentages as yt-dlp reports them.
///
/// Implementations own filtering and persistence; the fetcher forwards raw
/// values in reported order.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn progress(&self, percent: f64);
}

/// A completed fetch.
#[derive(Debug, Clone)]
pub struct FetchedAudio {
    /// Path of the written audio file.
    pub path: PathBuf,
}

/// Fetches audio from a source URL into a destination file.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download the audio behind `url` to `dest`, reporting progress to
    /// `sink`. `dest` carries the target extension; parent directories are
    /// created as needed.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<FetchedAudio, FetchError>;
}
