//! Playlist API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use spooty_core::orchestrator::NewPlaylistTrack;
use spooty_core::track::NewPlaylist;
use spooty_core::{OrchestratorError, Playlist, Track, TrackStore};

use super::tracks::{error_response, TrackErrorResponse};
use crate::metrics::{PLAYLISTS_CREATED_TOTAL, TRACKS_CREATED_TOTAL};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for importing a playlist with its tracks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistBody {
    pub name: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    /// Single-track import: downloaded audio lands in the downloads root
    /// instead of a playlist subfolder.
    #[serde(default)]
    pub is_track: bool,
    #[serde(default)]
    pub tracks: Vec<NewPlaylistTrack>,
}

/// Response for a playlist import
#[derive(Debug, Serialize)]
pub struct CreatePlaylistResponse {
    pub playlist: Playlist,
    pub tracks: Vec<Track>,
}

/// Response for stopping a playlist
#[derive(Debug, Serialize)]
pub struct StopPlaylistResponse {
    pub stopped: Vec<Track>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Import a playlist and schedule all its tracks for download
pub async fn create_playlist(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePlaylistBody>,
) -> Result<(StatusCode, Json<CreatePlaylistResponse>), (StatusCode, Json<TrackErrorResponse>)> {
    let request = NewPlaylist {
        name: body.name,
        cover_url: body.cover_url,
        is_track: body.is_track,
    };

    match state.orchestrator().create_playlist(request, body.tracks) {
        Ok((playlist, tracks)) => {
            PLAYLISTS_CREATED_TOTAL.inc();
            TRACKS_CREATED_TOTAL.inc_by(tracks.len() as u64);
            Ok((
                StatusCode::CREATED,
                Json(CreatePlaylistResponse { playlist, tracks }),
            ))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// List all playlists
pub async fn list_playlists(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Playlist>>, (StatusCode, Json<TrackErrorResponse>)> {
    match state.store().list_playlists() {
        Ok(playlists) => Ok(Json(playlists)),
        Err(e) => Err(error_response(e.into())),
    }
}

/// Get a playlist by ID
pub async fn get_playlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Playlist>, (StatusCode, Json<TrackErrorResponse>)> {
    match state.store().get_playlist(id) {
        Ok(Some(playlist)) => Ok(Json(playlist)),
        Ok(None) => Err(error_response(OrchestratorError::PlaylistNotFound(id))),
        Err(e) => Err(error_response(e.into())),
    }
}

/// List the tracks of a playlist
pub async fn get_playlist_tracks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Track>>, (StatusCode, Json<TrackErrorResponse>)> {
    match state.store().get_playlist(id) {
        Ok(Some(_)) => {}
        Ok(None) => return Err(error_response(OrchestratorError::PlaylistNotFound(id))),
        Err(e) => return Err(error_response(e.into())),
    }

    match state.store().list_by_playlist(id) {
        Ok(tracks) => Ok(Json(tracks)),
        Err(e) => Err(error_response(e.into())),
    }
}

/// Stop every non-completed track of a playlist
pub async fn stop_playlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<StopPlaylistResponse>, (StatusCode, Json<TrackErrorResponse>)> {
    match state.orchestrator().stop_by_playlist(id) {
        Ok(stopped) => Ok(Json(StopPlaylistResponse { stopped })),
        Err(e) => Err(error_response(e)),
    }
}
