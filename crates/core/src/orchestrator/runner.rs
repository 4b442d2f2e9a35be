//! Track orchestrator implementation.
//!
//! Owns the stage queues and worker tasks, and is the only writer of track
//! state transitions. User cancellations (force-fail, playlist stop) are
//! authoritative: in-flight stage results and progress callbacks that arrive
//! afterwards are dropped by conditional store writes.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::downloader::{AudioFetcher, ProgressSink};
use crate::events::{EventBus, TrackEvent};
use crate::layout;
use crate::queue::{job_key, TrackQueues};
use crate::searcher::TrackSearcher;
use crate::tagger::CoverTagger;
use crate::track::{
    ErrorReason, NewPlaylist, NewTrack, Playlist, Track, TrackStatus, TrackStore, UpdateOutcome,
};

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, OrchestratorStatus};

/// A track requested as part of a playlist import.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlaylistTrack {
    pub artist: String,
    pub name: String,
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// ProgressSink that persists download progress and fans out update events.
///
/// Raw percentages are clamped to 0-100, floored, and applied only when
/// strictly greater than the last applied value, so out-of-order callbacks
/// never move the bar backwards.
struct TrackProgress {
    track_id: i64,
    store: Arc<dyn TrackStore>,
    events: EventBus,
    last_applied: Mutex<Option<u8>>,
}

impl TrackProgress {
    fn new(track_id: i64, store: Arc<dyn TrackStore>, events: EventBus) -> Self {
        Self {
            track_id,
            store,
            events,
            last_applied: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ProgressSink for TrackProgress {
    async fn progress(&self, percent: f64) {
        let value = percent.clamp(0.0, 100.0).floor() as u8;

        {
            let mut last = self.last_applied.lock().unwrap();
            if last.is_some_and(|prev| value <= prev) {
                return;
            }
            *last = Some(value);
        }

        let current = match self.store.get(self.track_id) {
            Ok(Some(track)) => track,
            Ok(None) => return,
            Err(e) => {
                warn!(track_id = self.track_id, error = %e, "Progress read failed");
                return;
            }
        };

        let mut updated = current;
        updated.status = TrackStatus::Downloading;
        updated.progress = Some(value);

        match self.store.update_unless_user_stopped(self.track_id, &updated) {
            Ok(UpdateOutcome::Updated(track)) => {
                self.events.emit(TrackEvent::TrackUpdate { track });
            }
            Ok(_) => {}
            Err(e) => {
                warn!(track_id = self.track_id, error = %e, "Progress write failed");
            }
        }
    }
}

/// The track orchestrator - drives tracks through the download pipeline.
pub struct TrackOrchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn TrackStore>,
    searcher: Arc<dyn TrackSearcher>,
    fetcher: Arc<dyn AudioFetcher>,
    tagger: Arc<dyn CoverTagger>,
    queues: Arc<TrackQueues>,
    events: EventBus,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TrackOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn TrackStore>,
        searcher: Arc<dyn TrackSearcher>,
        fetcher: Arc<dyn AudioFetcher>,
        tagger: Arc<dyn CoverTagger>,
        events: EventBus,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            store,
            searcher,
            fetcher,
            tagger,
            queues: Arc::new(TrackQueues::new()),
            events,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> &Arc<dyn TrackStore> {
        &self.store
    }

    /// Start the orchestrator (spawns worker tasks).
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!("Starting track orchestrator");

        // Re-enqueue tracks that were mid-pipeline when we shut down
        if let Err(e) = self.recover() {
            error!("Failed to recover in-flight tracks: {}", e);
        }

        for idx in 0..self.config.search_workers {
            self.spawn_search_worker(idx);
        }
        for idx in 0..self.config.download_workers {
            self.spawn_download_worker(idx);
        }

        info!(
            search_workers = self.config.search_workers,
            download_workers = self.config.download_workers,
            "Track orchestrator started"
        );
    }

    /// Stop the orchestrator gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping track orchestrator");

        let _ = self.shutdown_tx.send(());

        // Give workers a moment to finish current work
        tokio::time::sleep(Duration::from_millis(200)).await;

        info!("Track orchestrator stopped");
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            running: self.running.load(Ordering::Relaxed),
            pending_searches: self.queues.search.len(),
            pending_downloads: self.queues.download.len(),
        }
    }

    /// Create a track and schedule it for search.
    pub fn create_track(&self, request: NewTrack) -> Result<Track, OrchestratorError> {
        if let Some(playlist_id) = request.playlist_id {
            self.store
                .get_playlist(playlist_id)?
                .ok_or(OrchestratorError::PlaylistNotFound(playlist_id))?;
        }

        let track = self.store.create(request)?;
        info!(track_id = track.id, artist = %track.artist, name = %track.name, "Track created");

        self.events.emit(TrackEvent::TrackNew {
            track: track.clone(),
            playlist_id: track.playlist_id,
        });
        self.queues.search.add(&job_key(track.id), track.id)?;

        Ok(track)
    }

    /// Create a playlist and its tracks, scheduling every track for search.
    pub fn create_playlist(
        &self,
        request: NewPlaylist,
        tracks: Vec<NewPlaylistTrack>,
    ) -> Result<(Playlist, Vec<Track>), OrchestratorError> {
        let playlist = self.store.create_playlist(request)?;
        info!(playlist_id = playlist.id, name = %playlist.name, tracks = tracks.len(), "Playlist created");

        let mut created = Vec::with_capacity(tracks.len());
        for entry in tracks {
            let track = self.store.create(NewTrack {
                artist: entry.artist,
                name: entry.name,
                cover_url: entry.cover_url,
                playlist_id: Some(playlist.id),
            })?;

            self.events.emit(TrackEvent::TrackNew {
                track: track.clone(),
                playlist_id: Some(playlist.id),
            });
            self.queues.search.add(&job_key(track.id), track.id)?;
            created.push(track);
        }

        Ok((playlist, created))
    }

    /// Delete a track, withdrawing any pending work first.
    pub fn delete_track(&self, track_id: i64) -> Result<(), OrchestratorError> {
        self.queues.remove_track(track_id);

        if !self.store.delete(track_id)? {
            return Err(OrchestratorError::TrackNotFound(track_id));
        }

        info!(track_id, "Track deleted");
        self.events.emit(TrackEvent::TrackDelete { id: track_id });
        Ok(())
    }

    /// Reset a track and run it through the pipeline again.
    ///
    /// Retry is unconditional on the current status. Stale queue entries are
    /// withdrawn first so an old download job cannot race the fresh search.
    pub fn retry(&self, track_id: i64) -> Result<Track, OrchestratorError> {
        let mut track = self
            .store
            .get(track_id)?
            .ok_or(OrchestratorError::TrackNotFound(track_id))?;

        self.queues.remove_track(track_id);

        track.status = TrackStatus::New;
        track.error = None;
        track.error_reason = None;
        track.progress = None;
        track.source_url = None;

        let track = self.store.update(track_id, &track)?;
        info!(track_id, "Track retry scheduled");

        self.events.emit(TrackEvent::TrackUpdate {
            track: track.clone(),
        });
        self.queues.search.add(&job_key(track_id), track_id)?;

        Ok(track)
    }

    /// Force a single track into a user-cancelled Error state.
    ///
    /// The write is unconditional: the user's decision wins over whatever the
    /// pipeline is doing, and the persisted reason blocks late stage writes.
    pub fn force_fail(&self, track_id: i64) -> Result<Track, OrchestratorError> {
        let mut track = self
            .store
            .get(track_id)?
            .ok_or(OrchestratorError::TrackNotFound(track_id))?;

        self.queues.remove_track(track_id);

        track.status = TrackStatus::Error;
        track.error = Some(format!("Forced failure by user at {}", Utc::now().to_rfc3339()));
        track.error_reason = Some(ErrorReason::ForcedFailure);

        let track = self.store.update(track_id, &track)?;
        info!(track_id, "Track force-failed by user");

        self.events.emit(TrackEvent::TrackUpdate {
            track: track.clone(),
        });
        Ok(track)
    }

    /// Stop every non-completed track of a playlist.
    pub fn stop_by_playlist(&self, playlist_id: i64) -> Result<Vec<Track>, OrchestratorError> {
        self.store
            .get_playlist(playlist_id)?
            .ok_or(OrchestratorError::PlaylistNotFound(playlist_id))?;

        let timestamp = Utc::now().to_rfc3339();
        let mut stopped = Vec::new();

        for mut track in self.store.list_by_playlist(playlist_id)? {
            if track.status == TrackStatus::Completed {
                continue;
            }

            self.queues.remove_track(track.id);

            track.status = TrackStatus::Error;
            track.error = Some(format!("Stopped by user at {}", timestamp));
            track.error_reason = Some(ErrorReason::StoppedByUser);

            let track = self.store.update(track.id, &track)?;
            self.events.emit(TrackEvent::TrackUpdate {
                track: track.clone(),
            });
            stopped.push(track);
        }

        info!(playlist_id, stopped = stopped.len(), "Playlist stopped by user");
        Ok(stopped)
    }

    /// Run the search stage for a track.
    ///
    /// Tracks deleted or cancelled while the job sat in the queue are
    /// skipped silently.
    pub async fn search(&self, track_id: i64) -> Result<(), OrchestratorError> {
        let track = match self.store.get(track_id)? {
            Some(track) => track,
            None => {
                debug!(track_id, "Search skipped: track gone");
                return Ok(());
            }
        };
        if track.is_user_stopped() {
            debug!(track_id, "Search skipped: stopped by user");
            return Ok(());
        }

        let mut searching = track.clone();
        searching.status = TrackStatus::Searching;
        searching.error = None;
        searching.error_reason = None;

        let track = match self.store.update_unless_user_stopped(track_id, &searching)? {
            UpdateOutcome::Updated(track) => {
                self.events.emit(TrackEvent::TrackUpdate {
                    track: track.clone(),
                });
                track
            }
            _ => return Ok(()),
        };

        match self.searcher.search(&track.artist, &track.name).await {
            Ok(url) => {
                debug!(track_id, %url, "Source resolved");

                let mut queued = track;
                queued.source_url = Some(url);
                queued.status = TrackStatus::Queued;

                if let UpdateOutcome::Updated(track) =
                    self.store.update_unless_user_stopped(track_id, &queued)?
                {
                    self.events.emit(TrackEvent::TrackUpdate { track });
                }
            }
            Err(e) => {
                warn!(track_id, error = %e, "Search failed");
                self.fail_stage(track_id, e.to_string())?;
            }
        }

        // Hand off unconditionally, failed searches included; the download
        // stage drops tracks already in a terminal error state.
        self.queues.download.add(&job_key(track_id), track_id)?;

        Ok(())
    }

    /// Run the download and tagging stages for a track.
    pub async fn download(&self, track_id: i64) -> Result<(), OrchestratorError> {
        let track = match self.store.get(track_id)? {
            Some(track) => track,
            None => {
                debug!(track_id, "Download skipped: track gone");
                return Ok(());
            }
        };
        if track.status == TrackStatus::Error {
            debug!(track_id, "Download skipped: track in terminal error state");
            return Ok(());
        }

        // An inconsistent record is left alone rather than corrupted further.
        if track.artist.trim().is_empty() || track.name.trim().is_empty() {
            warn!(track_id, "Download aborted: track record missing artist or name");
            return Ok(());
        }
        let playlist = match track.playlist_id {
            Some(playlist_id) => match self.store.get_playlist(playlist_id)? {
                Some(playlist) => Some(playlist),
                None => {
                    warn!(track_id, playlist_id, "Download aborted: playlist record missing");
                    return Ok(());
                }
            },
            None => None,
        };

        let Some(url) = track.source_url.clone() else {
            self.fail_stage(track_id, "No source URL resolved".to_string())?;
            return Ok(());
        };

        let mut downloading = track.clone();
        downloading.status = TrackStatus::Downloading;
        downloading.progress = Some(0);
        downloading.error = None;
        downloading.error_reason = None;

        let track = match self.store.update_unless_user_stopped(track_id, &downloading)? {
            UpdateOutcome::Updated(track) => {
                self.events.emit(TrackEvent::TrackUpdate {
                    track: track.clone(),
                });
                track
            }
            _ => return Ok(()),
        };

        let extension = self.config.format.extension();
        let dest = layout::track_path(
            &self.config.downloads_root,
            playlist.as_ref(),
            &track,
            extension,
        );

        let sink = TrackProgress::new(track_id, Arc::clone(&self.store), self.events.clone());

        match self.fetcher.fetch(&url, &dest, &sink).await {
            Ok(audio) => {
                let cover_url = track
                    .cover_url
                    .clone()
                    .or_else(|| playlist.as_ref().and_then(|p| p.cover_url.clone()));

                if let Err(message) = self
                    .tag_with_timeout(&audio.path, &track, cover_url.as_deref())
                    .await
                {
                    warn!(track_id, error = %message, "Tagging failed");
                    self.fail_stage(track_id, message)?;
                    return Ok(());
                }

                let mut completed = track;
                completed.status = TrackStatus::Completed;
                completed.progress = Some(100);
                completed.error = None;
                completed.error_reason = None;

                if let UpdateOutcome::Updated(track) =
                    self.store.update_unless_user_stopped(track_id, &completed)?
                {
                    info!(track_id, path = %audio.path.display(), "Track completed");
                    self.events.emit(TrackEvent::TrackUpdate { track });
                }
            }
            Err(e) => {
                warn!(track_id, error = %e, "Download failed");
                self.fail_stage(track_id, e.to_string())?;
            }
        }

        Ok(())
    }

    /// Run the tagging stage under the configured wall-clock limit.
    ///
    /// The fetch stage enforces the same limit on the yt-dlp subprocess, so
    /// together the two bound the whole download attempt.
    async fn tag_with_timeout(
        &self,
        path: &Path,
        track: &Track,
        cover_url: Option<&str>,
    ) -> Result<(), String> {
        let tag = self.tagger.tag(path, &track.artist, &track.name, cover_url);

        if self.config.download_timeout_ms > 0 {
            let limit = Duration::from_millis(self.config.download_timeout_ms as u64);
            match tokio::time::timeout(limit, tag).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("Tagging timed out after {}ms", limit.as_millis())),
            }
        } else {
            tag.await.map_err(|e| e.to_string())
        }
    }

    /// Record a stage failure, unless the user already cancelled the track.
    fn fail_stage(&self, track_id: i64, message: String) -> Result<(), OrchestratorError> {
        let Some(mut track) = self.store.get(track_id)? else {
            return Ok(());
        };

        track.status = TrackStatus::Error;
        track.error = Some(message);
        track.error_reason = Some(ErrorReason::Stage);

        if let UpdateOutcome::Updated(track) =
            self.store.update_unless_user_stopped(track_id, &track)?
        {
            self.events.emit(TrackEvent::TrackUpdate { track });
        }
        Ok(())
    }

    /// Re-enqueue tracks that were mid-pipeline at the last shutdown.
    fn recover(&self) -> Result<(), OrchestratorError> {
        let mut recovered = 0usize;
        for track in self.store.list()? {
            match track.status {
                TrackStatus::New | TrackStatus::Searching => {
                    self.queues.search.add(&job_key(track.id), track.id)?;
                    recovered += 1;
                }
                TrackStatus::Queued | TrackStatus::Downloading => {
                    self.queues.download.add(&job_key(track.id), track.id)?;
                    recovered += 1;
                }
                TrackStatus::Completed | TrackStatus::Error => {}
            }
        }
        if recovered > 0 {
            info!(recovered, "Re-enqueued in-flight tracks");
        }
        Ok(())
    }

    fn spawn_search_worker(self: &Arc<Self>, idx: usize) {
        let this = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            debug!(worker = idx, "Search worker started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    job = this.queues.search.recv() => {
                        let Ok(job) = job else { break };
                        if !this.running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = this.search(job.payload).await {
                            warn!(track_id = job.payload, error = %e, "Search stage error");
                        }
                    }
                }
            }
            debug!(worker = idx, "Search worker stopped");
        });
    }

    fn spawn_download_worker(self: &Arc<Self>, idx: usize) {
        let this = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            debug!(worker = idx, "Download worker started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    job = this.queues.download.recv() => {
                        let Ok(job) = job else { break };
                        if !this.running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = this.download(job.payload).await {
                            warn!(track_id = job.payload, error = %e, "Download stage error");
                        }
                    }
                }
            }
            debug!(worker = idx, "Download worker stopped");
        });
    }
}
