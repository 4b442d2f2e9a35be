//! In-memory track store for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::track::{
    NewPlaylist, NewTrack, Playlist, Track, TrackError, TrackStatus, TrackStore, UpdateOutcome,
};

#[derive(Default)]
struct Inner {
    tracks: BTreeMap<i64, Track>,
    playlists: BTreeMap<i64, Playlist>,
    next_track_id: i64,
    next_playlist_id: i64,
}

/// TrackStore backed by in-memory maps, mirroring the SQLite store's
/// conditional-update semantics.
#[derive(Default)]
pub struct MemoryTrackStore {
    inner: Mutex<Inner>,
}

impl MemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackStore for MemoryTrackStore {
    fn create(&self, request: NewTrack) -> Result<Track, TrackError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_track_id += 1;
        let now = Utc::now();
        let track = Track {
            id: inner.next_track_id,
            artist: request.artist,
            name: request.name,
            source_url: None,
            status: TrackStatus::New,
            progress: None,
            error: None,
            error_reason: None,
            cover_url: request.cover_url,
            playlist_id: request.playlist_id,
            created_at: now,
            updated_at: now,
        };
        inner.tracks.insert(track.id, track.clone());
        Ok(track)
    }

    fn get(&self, id: i64) -> Result<Option<Track>, TrackError> {
        Ok(self.inner.lock().unwrap().tracks.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Track>, TrackError> {
        Ok(self.inner.lock().unwrap().tracks.values().cloned().collect())
    }

    fn list_by_playlist(&self, playlist_id: i64) -> Result<Vec<Track>, TrackError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .tracks
            .values()
            .filter(|t| t.playlist_id == Some(playlist_id))
            .cloned()
            .collect())
    }

    fn update(&self, id: i64, track: &Track) -> Result<Track, TrackError> {
        let mut inner = self.inner.lock().unwrap();
        let existing = inner.tracks.get_mut(&id).ok_or(TrackError::NotFound(id))?;
        let mut updated = track.clone();
        updated.id = id;
        updated.created_at = existing.created_at;
        updated.updated_at = Utc::now();
        *existing = updated.clone();
        Ok(updated)
    }

    fn update_unless_user_stopped(
        &self,
        id: i64,
        track: &Track,
    ) -> Result<UpdateOutcome, TrackError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(existing) = inner.tracks.get_mut(&id) else {
            return Ok(UpdateOutcome::Gone);
        };
        if existing.is_user_stopped() {
            return Ok(UpdateOutcome::Skipped);
        }
        let mut updated = track.clone();
        updated.id = id;
        updated.created_at = existing.created_at;
        updated.updated_at = Utc::now();
        *existing = updated.clone();
        Ok(UpdateOutcome::Updated(updated))
    }

    fn delete(&self, id: i64) -> Result<bool, TrackError> {
        Ok(self.inner.lock().unwrap().tracks.remove(&id).is_some())
    }

    fn create_playlist(&self, request: NewPlaylist) -> Result<Playlist, TrackError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_playlist_id += 1;
        let playlist = Playlist {
            id: inner.next_playlist_id,
            name: request.name,
            cover_url: request.cover_url,
            is_track: request.is_track,
        };
        inner.playlists.insert(playlist.id, playlist.clone());
        Ok(playlist)
    }

    fn get_playlist(&self, id: i64) -> Result<Option<Playlist>, TrackError> {
        Ok(self.inner.lock().unwrap().playlists.get(&id).cloned())
    }

    fn list_playlists(&self) -> Result<Vec<Playlist>, TrackError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .playlists
            .values()
            .cloned()
            .collect())
    }
}
