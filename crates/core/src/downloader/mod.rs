//! Audio download stage: yt-dlp subprocess driving and progress reporting.

mod cookies;
mod types;
mod ytdlp;

pub use cookies::{CookieSource, Cookies};
pub use types::{
    classify_stderr, stderr_summary, AudioFetcher, FailureKind, FetchError, FetchedAudio,
    ProgressSink,
};
pub use ytdlp::YtDlpFetcher;
