//! Audio fetcher backed by the yt-dlp CLI.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::cookies::Cookies;
use super::types::{
    classify_stderr, stderr_summary, AudioFetcher, FailureKind, FetchError, FetchedAudio,
    ProgressSink,
};

// Matches yt-dlp's --newline progress lines: "[download]  42.3% of ...".
static PROGRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)%").unwrap());

/// Parse a progress percentage out of a yt-dlp stdout line.
pub(crate) fn parse_progress_line(line: &str) -> Option<f64> {
    PROGRESS_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Downloads best-quality audio with yt-dlp, extracting to the configured
/// format.
pub struct YtDlpFetcher {
    ytdlp_path: PathBuf,
    audio_format: String,
    /// Wall-clock limit per download in milliseconds; non-positive disables.
    timeout_ms: i64,
    cookies: Arc<Cookies>,
}

impl YtDlpFetcher {
    pub fn new(
        ytdlp_path: PathBuf,
        audio_format: String,
        timeout_ms: i64,
        cookies: Arc<Cookies>,
    ) -> Self {
        Self {
            ytdlp_path,
            audio_format,
            timeout_ms,
            cookies,
        }
    }

    fn build_args(&self, url: &str, dest: &Path, cookie_file: Option<&Path>) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            "bestaudio".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "-o".to_string(),
            dest.to_string_lossy().into_owned(),
        ];
        if let Some(file) = cookie_file {
            args.push("--cookies".to_string());
            args.push(file.to_string_lossy().into_owned());
        }
        args.push(url.to_string());
        args
    }

    async fn run(
        &self,
        url: &str,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<FetchedAudio, FetchError> {
        let cookie_file = self.cookies.file_path()?;
        let args = self.build_args(url, dest, cookie_file.as_deref());

        debug!(url, dest = %dest.display(), "Spawning yt-dlp download");

        let mut child = Command::new(&self.ytdlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::ToolNotFound {
                        path: self.ytdlp_path.to_string_lossy().into_owned(),
                    }
                } else {
                    FetchError::Io(e)
                }
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            FetchError::Process {
                detail: "failed to capture stdout".to_string(),
            }
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            FetchError::Process {
                detail: "failed to capture stderr".to_string(),
            }
        })?;

        // Drain stderr off the main loop so the pipe can't back up.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(percent) = parse_progress_line(&line) {
                sink.progress(percent).await;
            }
        }

        let status = child.wait().await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let detail = stderr_summary(&stderr_output);
            warn!(url, %detail, "yt-dlp download failed");
            return Err(match classify_stderr(&stderr_output) {
                FailureKind::AccessRestricted => FetchError::AccessRestricted { detail },
                FailureKind::ChallengeSolving => FetchError::ChallengeSolving { detail },
                FailureKind::Other => FetchError::Process { detail },
            });
        }

        Ok(FetchedAudio {
            path: dest.to_path_buf(),
        })
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<FetchedAudio, FetchError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if self.timeout_ms > 0 {
            // On timeout the run future is dropped; kill_on_drop reaps the
            // subprocess.
            match tokio::time::timeout(
                Duration::from_millis(self.timeout_ms as u64),
                self.run(url, dest, sink),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    ms: self.timeout_ms,
                }),
            }
        } else {
            self.run(url, dest, sink).await
        }
    }
}
