//! Common test utilities for in-process API testing.
//!
//! Builds the full router against a temp-dir SQLite store and mock pipeline
//! stages, so API behavior can be tested without yt-dlp or the network.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use spooty_core::downloader::AudioFetcher;
use spooty_core::searcher::TrackSearcher;
use spooty_core::tagger::CoverTagger;
use spooty_core::testing::{MockFetcher, MockSearcher, MockTagger};
use spooty_core::track::SqliteTrackStore;
use spooty_core::{
    Config, EventBus, OrchestratorConfig, TrackOrchestrator, TrackStore,
};

use spooty_server::api::create_router;
use spooty_server::state::AppState;

/// Test fixture wiring the router to mock pipeline stages.
pub struct TestFixture {
    pub router: Router,
    pub orchestrator: Arc<TrackOrchestrator>,
    pub searcher: Arc<MockSearcher>,
    pub fetcher: Arc<MockFetcher>,
    pub tagger: Arc<MockTagger>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture with workers stopped: API calls enqueue work but
    /// nothing consumes it.
    pub async fn new() -> Self {
        Self::build(false).await
    }

    /// Create a fixture with orchestrator workers running, for end-to-end
    /// lifecycle tests.
    pub async fn with_workers() -> Self {
        Self::build(true).await
    }

    async fn build(start_workers: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config = Config::default();
        config.database.path = db_path.clone();
        config.downloads.root = temp_dir.path().join("downloads");

        let store: Arc<dyn TrackStore> = Arc::new(
            SqliteTrackStore::new(&db_path).expect("Failed to create track store"),
        );

        let searcher = Arc::new(MockSearcher::new());
        let fetcher = Arc::new(MockFetcher::new());
        let tagger = Arc::new(MockTagger::new());

        let orchestrator = Arc::new(TrackOrchestrator::new(
            OrchestratorConfig::from(&config),
            store,
            Arc::clone(&searcher) as Arc<dyn TrackSearcher>,
            Arc::clone(&fetcher) as Arc<dyn AudioFetcher>,
            Arc::clone(&tagger) as Arc<dyn CoverTagger>,
            EventBus::default(),
        ));

        if start_workers {
            orchestrator.start().await;
        }

        let state = Arc::new(AppState::new(config, Arc::clone(&orchestrator)));
        let router = create_router(state);

        Self {
            router,
            orchestrator,
            searcher,
            fetcher,
            tagger,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with an empty body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a GET request and return the body as plain text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
