//! Track searcher backed by the yt-dlp CLI.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::downloader::{classify_stderr, stderr_summary, Cookies, FailureKind};

use super::types::{SearchError, TrackSearcher};

/// Resolves "<artist> - <name>" to the first YouTube search hit's watch URL.
pub struct YtDlpSearcher {
    ytdlp_path: PathBuf,
    cookies: Arc<Cookies>,
}

impl YtDlpSearcher {
    pub fn new(ytdlp_path: PathBuf, cookies: Arc<Cookies>) -> Self {
        Self {
            ytdlp_path,
            cookies,
        }
    }

    fn query(artist: &str, name: &str) -> String {
        format!("{} - {}", artist, name)
    }
}

#[async_trait]
impl TrackSearcher for YtDlpSearcher {
    async fn search(&self, artist: &str, name: &str) -> Result<String, SearchError> {
        let query = Self::query(artist, name);
        debug!(%query, "Searching for track");

        let mut cmd = Command::new(&self.ytdlp_path);
        cmd.arg(format!("ytsearch1:{}", query))
            .arg("--print")
            .arg("webpage_url")
            .arg("--skip-download")
            .arg("--no-warnings")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cookie_file) = self.cookies.file_path()? {
            cmd.arg("--cookies").arg(cookie_file);
        }

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SearchError::ToolNotFound {
                    path: self.ytdlp_path.to_string_lossy().into_owned(),
                }
            } else {
                SearchError::Io(e)
            }
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let detail = stderr_summary(&stderr);
            return Err(match classify_stderr(&stderr) {
                FailureKind::AccessRestricted => SearchError::AccessRestricted { detail },
                FailureKind::ChallengeSolving => SearchError::ChallengeSolving { detail },
                FailureKind::Other => SearchError::Process { detail },
            });
        }

        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if url.is_empty() {
            return Err(SearchError::NoResults { query });
        }

        debug!(%query, %url, "Search resolved");
        Ok(url)
    }
}
