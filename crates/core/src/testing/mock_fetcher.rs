//! Mock audio fetcher for tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::downloader::{AudioFetcher, FetchError, FetchedAudio, ProgressSink};

type Hook = Box<dyn FnOnce() + Send>;

/// Scripted fetcher: reports a fixed progress sequence and then succeeds
/// (writing a placeholder file) or fails with the queued error.
pub struct MockFetcher {
    progress_reports: Mutex<Vec<f64>>,
    failures: Mutex<Vec<FetchError>>,
    midway_hook: Mutex<Option<Hook>>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            progress_reports: Mutex::new(vec![0.0, 25.0, 50.0, 75.0, 100.0]),
            failures: Mutex::new(Vec::new()),
            midway_hook: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Override the raw progress values reported during fetch.
    pub fn script_progress(&self, reports: Vec<f64>) {
        *self.progress_reports.lock().unwrap() = reports;
    }

    /// Queue a failure for the next fetch call.
    pub fn fail_next(&self, error: FetchError) {
        self.failures.lock().unwrap().push(error);
    }

    /// Run a callback after half of the progress reports have been
    /// delivered, before the fetch resolves.
    pub fn on_midway(&self, hook: impl FnOnce() + Send + 'static) {
        *self.midway_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioFetcher for MockFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<FetchedAudio, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), dest.to_path_buf()));

        let reports = self.progress_reports.lock().unwrap().clone();
        let midway = reports.len() / 2;

        for (i, percent) in reports.iter().enumerate() {
            if i == midway {
                if let Some(hook) = self.midway_hook.lock().unwrap().take() {
                    hook();
                }
            }
            sink.progress(*percent).await;
        }

        if let Some(error) = self.failures.lock().unwrap().pop() {
            return Err(error);
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, b"mock audio")?;

        Ok(FetchedAudio {
            path: dest.to_path_buf(),
        })
    }
}
