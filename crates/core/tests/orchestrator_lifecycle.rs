//! Orchestrator lifecycle integration tests.
//!
//! These tests drive full track lifecycles through the orchestrator:
//! new -> searching -> queued -> downloading -> completed, plus the user
//! cancellation paths that must win over in-flight stage work.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use spooty_core::{
    downloader::FetchError,
    orchestrator::NewPlaylistTrack,
    searcher::SearchError,
    testing::{MockFetcher, MockSearcher, MockTagger},
    track::{NewPlaylist, NewTrack, SqliteTrackStore},
    AudioFormat, ErrorReason, EventBus, OrchestratorConfig, OrchestratorError, TrackEvent,
    TrackOrchestrator, TrackStatus, TrackStore,
};

/// Test helper wiring the orchestrator to mock stages and a real store.
struct TestHarness {
    store: Arc<SqliteTrackStore>,
    searcher: Arc<MockSearcher>,
    fetcher: Arc<MockFetcher>,
    tagger: Arc<MockTagger>,
    downloads_root: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteTrackStore::new(&temp_dir.path().join("test.db"))
                .expect("Failed to create track store"),
        );

        Self {
            store,
            searcher: Arc::new(MockSearcher::new()),
            fetcher: Arc::new(MockFetcher::new()),
            tagger: Arc::new(MockTagger::new()),
            downloads_root: temp_dir.path().join("music"),
            _temp_dir: temp_dir,
        }
    }

    fn orchestrator(&self) -> Arc<TrackOrchestrator> {
        let config = OrchestratorConfig {
            downloads_root: self.downloads_root.clone(),
            format: AudioFormat::M4a,
            download_timeout_ms: 10_000,
            search_workers: 1,
            download_workers: 1,
        };

        Arc::new(TrackOrchestrator::new(
            config,
            Arc::clone(&self.store) as Arc<dyn TrackStore>,
            Arc::clone(&self.searcher) as _,
            Arc::clone(&self.fetcher) as _,
            Arc::clone(&self.tagger) as _,
            EventBus::default(),
        ))
    }

    fn new_track(&self, artist: &str, name: &str) -> NewTrack {
        NewTrack {
            artist: artist.to_string(),
            name: name.to_string(),
            cover_url: None,
            playlist_id: None,
        }
    }

    async fn wait_for_status(
        &self,
        track_id: i64,
        expected: TrackStatus,
        timeout: Duration,
    ) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(track)) = self.store.get(track_id) {
                if track.status == expected {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

#[tokio::test]
async fn test_track_lifecycle_completes() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    let (playlist, tracks) = orch
        .create_playlist(
            NewPlaylist {
                name: "Evening Mix".to_string(),
                cover_url: Some("http://covers/evening.jpg".to_string()),
                is_track: false,
            },
            vec![NewPlaylistTrack {
                artist: "Portishead".to_string(),
                name: "Roads".to_string(),
                cover_url: None,
            }],
        )
        .unwrap();
    let track_id = tracks[0].id;

    orch.search(track_id).await.unwrap();
    let track = harness.store.get(track_id).unwrap().unwrap();
    assert_eq!(track.status, TrackStatus::Queued);
    assert!(track.source_url.is_some());

    orch.download(track_id).await.unwrap();
    let track = harness.store.get(track_id).unwrap().unwrap();
    assert_eq!(track.status, TrackStatus::Completed);
    assert_eq!(track.progress, Some(100));
    assert!(track.error.is_none());

    // File under the playlist's subfolder
    let expected = harness
        .downloads_root
        .join(&playlist.name)
        .join("Portishead - Roads.m4a");
    assert!(expected.exists());

    // Cover art falls back to the playlist's cover
    let tag_calls = harness.tagger.calls();
    assert_eq!(tag_calls.len(), 1);
    assert_eq!(tag_calls[0].artist, "Portishead");
    assert_eq!(tag_calls[0].title, "Roads");
    assert_eq!(
        tag_calls[0].cover_url.as_deref(),
        Some("http://covers/evening.jpg")
    );
}

#[tokio::test]
async fn test_single_track_lands_in_downloads_root() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    let (_, tracks) = orch
        .create_playlist(
            NewPlaylist {
                name: "single".to_string(),
                cover_url: None,
                is_track: true,
            },
            vec![NewPlaylistTrack {
                artist: "Bjork".to_string(),
                name: "Hyperballad".to_string(),
                cover_url: None,
            }],
        )
        .unwrap();
    let track_id = tracks[0].id;

    orch.search(track_id).await.unwrap();
    orch.download(track_id).await.unwrap();

    assert!(harness
        .downloads_root
        .join("Bjork - Hyperballad.m4a")
        .exists());
}

#[tokio::test]
async fn test_workers_drive_track_to_completion() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();
    orch.start().await;

    let track = orch
        .create_track(harness.new_track("Can", "Vitamin C"))
        .unwrap();

    assert!(
        harness
            .wait_for_status(track.id, TrackStatus::Completed, Duration::from_secs(5))
            .await,
        "track never completed"
    );

    orch.stop().await;
}

#[tokio::test]
async fn test_create_emits_event_and_schedules_search() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();
    let mut events = orch.events().subscribe();

    let track = orch
        .create_track(harness.new_track("Neu!", "Hallogallo"))
        .unwrap();
    assert_eq!(track.status, TrackStatus::New);

    match events.try_recv().unwrap() {
        TrackEvent::TrackNew { track: t, .. } => assert_eq!(t.id, track.id),
        other => panic!("Expected trackNew, got {:?}", other),
    }

    assert_eq!(orch.status().pending_searches, 1);
}

#[tokio::test]
async fn test_search_failure_is_stage_error() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    harness.searcher.push_error(SearchError::NoResults {
        query: "Nobody - Nothing".to_string(),
    });

    let track = orch
        .create_track(harness.new_track("Nobody", "Nothing"))
        .unwrap();
    orch.search(track.id).await.unwrap();

    let track = harness.store.get(track.id).unwrap().unwrap();
    assert_eq!(track.status, TrackStatus::Error);
    assert_eq!(track.error_reason, Some(ErrorReason::Stage));
    assert!(track.error.unwrap().contains("No result found"));
}

#[tokio::test]
async fn test_force_fail_wins_over_inflight_download() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    let track = orch
        .create_track(harness.new_track("Slowdive", "Alison"))
        .unwrap();
    orch.search(track.id).await.unwrap();

    // User force-fails mid-download; later progress and the completion
    // write must both be dropped.
    let orch_for_hook = Arc::clone(&orch);
    let track_id = track.id;
    harness.fetcher.on_midway(move || {
        orch_for_hook.force_fail(track_id).unwrap();
    });

    orch.download(track_id).await.unwrap();

    let track = harness.store.get(track_id).unwrap().unwrap();
    assert_eq!(track.status, TrackStatus::Error);
    assert_eq!(track.error_reason, Some(ErrorReason::ForcedFailure));
    assert!(track
        .error
        .as_deref()
        .unwrap()
        .starts_with("Forced failure by user at "));
    // Progress froze at the last value applied before the cancellation.
    assert_eq!(track.progress, Some(25));
}

#[tokio::test]
async fn test_download_guard_skips_user_stopped_track() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    let track = orch.create_track(harness.new_track("Low", "Words")).unwrap();
    orch.search(track.id).await.unwrap();
    orch.force_fail(track.id).unwrap();

    orch.download(track.id).await.unwrap();
    assert!(harness.fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_stop_by_playlist_skips_completed_and_clears_queue() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    let (playlist, tracks) = orch
        .create_playlist(
            NewPlaylist {
                name: "Mix".to_string(),
                cover_url: None,
                is_track: false,
            },
            vec![
                NewPlaylistTrack {
                    artist: "A".to_string(),
                    name: "one".to_string(),
                    cover_url: None,
                },
                NewPlaylistTrack {
                    artist: "B".to_string(),
                    name: "two".to_string(),
                    cover_url: None,
                },
                NewPlaylistTrack {
                    artist: "C".to_string(),
                    name: "three".to_string(),
                    cover_url: None,
                },
            ],
        )
        .unwrap();

    // First track already finished
    let mut done = tracks[0].clone();
    done.status = TrackStatus::Completed;
    done.progress = Some(100);
    harness.store.update(done.id, &done).unwrap();

    let stopped = orch.stop_by_playlist(playlist.id).unwrap();
    assert_eq!(stopped.len(), 2);
    for track in &stopped {
        assert_eq!(track.status, TrackStatus::Error);
        assert_eq!(track.error_reason, Some(ErrorReason::StoppedByUser));
        assert!(track
            .error
            .as_deref()
            .unwrap()
            .starts_with("Stopped by user at "));
    }

    // Completed track untouched, pending search jobs withdrawn
    let done = harness.store.get(done.id).unwrap().unwrap();
    assert_eq!(done.status, TrackStatus::Completed);
    assert_eq!(orch.status().pending_searches, 0);
}

#[tokio::test]
async fn test_retry_resets_track_and_reschedules() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    harness.searcher.push_error(SearchError::NoResults {
        query: "x".to_string(),
    });
    let track = orch
        .create_track(harness.new_track("Broadcast", "Tender Buttons"))
        .unwrap();
    orch.search(track.id).await.unwrap();
    assert_eq!(orch.status().pending_searches, 0);

    let retried = orch.retry(track.id).unwrap();
    assert_eq!(retried.status, TrackStatus::New);
    assert!(retried.error.is_none());
    assert!(retried.error_reason.is_none());
    assert!(retried.progress.is_none());
    assert_eq!(orch.status().pending_searches, 1);

    // Second attempt succeeds
    orch.search(track.id).await.unwrap();
    let track = harness.store.get(track.id).unwrap().unwrap();
    assert_eq!(track.status, TrackStatus::Queued);
}

#[tokio::test]
async fn test_retry_resets_track_regardless_of_status() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    // Retry on a freshly created track just resets it; the pending search
    // job count stays at one.
    let track = orch.create_track(harness.new_track("A", "B")).unwrap();
    let retried = orch.retry(track.id).unwrap();
    assert_eq!(retried.status, TrackStatus::New);
    assert_eq!(orch.status().pending_searches, 1);

    // A queued track's stale download job is withdrawn in favour of a
    // fresh search.
    orch.search(track.id).await.unwrap();
    assert_eq!(orch.status().pending_downloads, 1);

    let retried = orch.retry(track.id).unwrap();
    assert_eq!(retried.status, TrackStatus::New);
    assert!(retried.source_url.is_none());
    assert_eq!(orch.status().pending_downloads, 0);
    assert_eq!(orch.status().pending_searches, 1);

    // A completed track goes back through the pipeline too.
    let mut done = harness.store.get(track.id).unwrap().unwrap();
    done.status = TrackStatus::Completed;
    done.progress = Some(100);
    harness.store.update(done.id, &done).unwrap();

    let retried = orch.retry(track.id).unwrap();
    assert_eq!(retried.status, TrackStatus::New);
    assert!(retried.progress.is_none());
}

#[tokio::test]
async fn test_delete_withdraws_pending_work() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();
    let mut events = orch.events().subscribe();

    let track = orch
        .create_track(harness.new_track("Stereolab", "Cybele's Reverie"))
        .unwrap();
    assert_eq!(orch.status().pending_searches, 1);

    orch.delete_track(track.id).unwrap();
    assert_eq!(orch.status().pending_searches, 0);
    assert!(harness.store.get(track.id).unwrap().is_none());

    // trackNew then trackDelete
    let _ = events.try_recv().unwrap();
    assert_eq!(
        events.try_recv().unwrap(),
        TrackEvent::TrackDelete { id: track.id }
    );

    assert!(matches!(
        orch.delete_track(track.id),
        Err(OrchestratorError::TrackNotFound(_))
    ));
}

#[tokio::test]
async fn test_access_restricted_failure_surfaces_cookie_guidance() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    let track = orch
        .create_track(harness.new_track("Aphex Twin", "Windowlicker"))
        .unwrap();
    orch.search(track.id).await.unwrap();

    harness.fetcher.script_progress(vec![0.0, 40.0]);
    harness.fetcher.fail_next(FetchError::AccessRestricted {
        detail: "Sign in to confirm your age".to_string(),
    });
    orch.download(track.id).await.unwrap();

    let track = harness.store.get(track.id).unwrap().unwrap();
    assert_eq!(track.status, TrackStatus::Error);
    assert_eq!(track.error_reason, Some(ErrorReason::Stage));
    assert!(track.error.unwrap().contains("SPOOTY_YOUTUBE_COOKIES"));
    // Progress stays where the fetch left it
    assert_eq!(track.progress, Some(40));
}

#[tokio::test]
async fn test_recovery_reenqueues_inflight_tracks() {
    let harness = TestHarness::new();

    // Simulate state left over from a previous run
    let orch = harness.orchestrator();
    let searching = orch.create_track(harness.new_track("A", "one")).unwrap();
    let queued = orch.create_track(harness.new_track("B", "two")).unwrap();

    let mut t = searching.clone();
    t.status = TrackStatus::Searching;
    harness.store.update(t.id, &t).unwrap();

    let mut t = queued.clone();
    t.status = TrackStatus::Queued;
    t.source_url = Some("https://youtube.com/watch?v=two".to_string());
    harness.store.update(t.id, &t).unwrap();

    // Fresh orchestrator over the same store picks both up
    let orch2 = harness.orchestrator();
    orch2.start().await;

    assert!(
        harness
            .wait_for_status(searching.id, TrackStatus::Completed, Duration::from_secs(5))
            .await
    );
    assert!(
        harness
            .wait_for_status(queued.id, TrackStatus::Completed, Duration::from_secs(5))
            .await
    );

    orch2.stop().await;
}
