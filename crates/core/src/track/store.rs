//! Track storage trait and request types.

use thiserror::Error;

use crate::track::{Playlist, Track};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum TrackError {
    /// Track not found.
    #[error("Track not found: {0}")]
    NotFound(i64),

    /// Playlist not found.
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(i64),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Request to persist a new track.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub artist: String,
    pub name: String,
    /// Cover art URL; overrides the playlist's cover when present.
    pub cover_url: Option<String>,
    /// Owning playlist; None means "ungrouped".
    pub playlist_id: Option<i64>,
}

/// Request to persist a new playlist.
#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub name: String,
    pub cover_url: Option<String>,
    pub is_track: bool,
}

/// Outcome of a conditional update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The row was written; carries the updated track.
    Updated(Track),
    /// The persisted row is already a user-cancelled Error; nothing written.
    Skipped,
    /// The track no longer exists.
    Gone,
}

/// Trait for track storage backends.
///
/// The persisted track record is the single source of truth for the
/// pipeline: all stages re-read it before making terminal decisions.
pub trait TrackStore: Send + Sync {
    /// Persist a new track with status New. The store assigns the id.
    fn create(&self, request: NewTrack) -> Result<Track, TrackError>;

    /// Get a track by id.
    fn get(&self, id: i64) -> Result<Option<Track>, TrackError>;

    /// List all tracks, oldest first.
    fn list(&self) -> Result<Vec<Track>, TrackError>;

    /// List tracks belonging to a playlist, oldest first.
    fn list_by_playlist(&self, playlist_id: i64) -> Result<Vec<Track>, TrackError>;

    /// Overwrite a track's mutable fields with the given snapshot.
    fn update(&self, id: i64, track: &Track) -> Result<Track, TrackError>;

    /// Overwrite a track's mutable fields unless the persisted row is
    /// already an Error with a user-cancellation reason.
    ///
    /// The read-check-write happens atomically (one transaction / one lock
    /// hold), closing the race between late stage results and a user's
    /// force-fail or stop.
    fn update_unless_user_stopped(
        &self,
        id: i64,
        track: &Track,
    ) -> Result<UpdateOutcome, TrackError>;

    /// Delete a track. Returns false if it did not exist.
    fn delete(&self, id: i64) -> Result<bool, TrackError>;

    /// Persist a new playlist. The store assigns the id.
    fn create_playlist(&self, request: NewPlaylist) -> Result<Playlist, TrackError>;

    /// Get a playlist by id.
    fn get_playlist(&self, id: i64) -> Result<Option<Playlist>, TrackError>;

    /// List all playlists, oldest first.
    fn list_playlists(&self) -> Result<Vec<Playlist>, TrackError>;
}
