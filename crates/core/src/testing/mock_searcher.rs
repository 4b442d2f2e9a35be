//! Mock searcher for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::searcher::{SearchError, TrackSearcher};

/// Scripted searcher: hands out queued results in order, falling back to a
/// deterministic URL derived from the query. Records every call.
pub struct MockSearcher {
    results: Mutex<VecDeque<Result<String, SearchError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful result for the next search call.
    pub fn push_url(&self, url: &str) {
        self.results.lock().unwrap().push_back(Ok(url.to_string()));
    }

    /// Queue a failure for the next search call.
    pub fn push_error(&self, error: SearchError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    /// The (artist, name) pairs searched so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackSearcher for MockSearcher {
    async fn search(&self, artist: &str, name: &str) -> Result<String, SearchError> {
        self.calls
            .lock()
            .unwrap()
            .push((artist.to_string(), name.to_string()));

        match self.results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(format!(
                "https://youtube.com/watch?v={}",
                name.to_lowercase().replace(' ', "-")
            )),
        }
    }
}
