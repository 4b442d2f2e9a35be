//! Mock tagger for tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::tagger::{CoverTagger, TagError};

/// Records tagging calls; succeeds unless a failure is queued.
#[derive(Default)]
pub struct MockTagger {
    failures: Mutex<Vec<TagError>>,
    calls: Mutex<Vec<TagCall>>,
}

#[derive(Debug, Clone)]
pub struct TagCall {
    pub path: PathBuf,
    pub artist: String,
    pub title: String,
    pub cover_url: Option<String>,
}

impl MockTagger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, error: TagError) {
        self.failures.lock().unwrap().push(error);
    }

    pub fn calls(&self) -> Vec<TagCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CoverTagger for MockTagger {
    async fn tag(
        &self,
        path: &Path,
        artist: &str,
        title: &str,
        cover_url: Option<&str>,
    ) -> Result<(), TagError> {
        self.calls.lock().unwrap().push(TagCall {
            path: path.to_path_buf(),
            artist: artist.to_string(),
            title: title.to_string(),
            cover_url: cover_url.map(str::to_string),
        });

        if let Some(error) = self.failures.lock().unwrap().pop() {
            return Err(error);
        }
        Ok(())
    }
}
