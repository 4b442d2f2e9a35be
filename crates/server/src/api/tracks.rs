//! Track API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use spooty_core::track::NewTrack;
use spooty_core::{OrchestratorError, Track, TrackStore};

use crate::metrics::TRACKS_CREATED_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a track
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrackBody {
    pub artist: String,
    pub name: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub playlist_id: Option<i64>,
}

/// Query parameters for listing tracks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTracksParams {
    /// Restrict to a single playlist
    pub playlist_id: Option<i64>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TrackErrorResponse {
    pub error: String,
}

pub(super) fn error_response(e: OrchestratorError) -> (StatusCode, Json<TrackErrorResponse>) {
    let status = match &e {
        OrchestratorError::TrackNotFound(_) | OrchestratorError::PlaylistNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        OrchestratorError::Store(_) | OrchestratorError::Queue(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(TrackErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new track and schedule it for download
pub async fn create_track(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTrackBody>,
) -> Result<(StatusCode, Json<Track>), (StatusCode, Json<TrackErrorResponse>)> {
    let request = NewTrack {
        artist: body.artist,
        name: body.name,
        cover_url: body.cover_url,
        playlist_id: body.playlist_id,
    };

    match state.orchestrator().create_track(request) {
        Ok(track) => {
            TRACKS_CREATED_TOTAL.inc();
            Ok((StatusCode::CREATED, Json(track)))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// List tracks, optionally filtered by playlist
pub async fn list_tracks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTracksParams>,
) -> Result<Json<Vec<Track>>, (StatusCode, Json<TrackErrorResponse>)> {
    let result = match params.playlist_id {
        Some(playlist_id) => state.store().list_by_playlist(playlist_id),
        None => state.store().list(),
    };

    match result {
        Ok(tracks) => Ok(Json(tracks)),
        Err(e) => Err(error_response(e.into())),
    }
}

/// Get a track by ID
pub async fn get_track(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Track>, (StatusCode, Json<TrackErrorResponse>)> {
    match state.store().get(id) {
        Ok(Some(track)) => Ok(Json(track)),
        Ok(None) => Err(error_response(OrchestratorError::TrackNotFound(id))),
        Err(e) => Err(error_response(e.into())),
    }
}

/// Delete a track, withdrawing any pending work
pub async fn delete_track(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<TrackErrorResponse>)> {
    match state.orchestrator().delete_track(id) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(error_response(e)),
    }
}

/// Reset a track and run it through the pipeline again
pub async fn retry_track(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Track>, (StatusCode, Json<TrackErrorResponse>)> {
    match state.orchestrator().retry(id) {
        Ok(track) => Ok(Json(track)),
        Err(e) => Err(error_response(e)),
    }
}

/// Force a track into a user-cancelled error state
pub async fn force_fail_track(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Track>, (StatusCode, Json<TrackErrorResponse>)> {
    match state.orchestrator().force_fail(id) {
        Ok(track) => Ok(Json(track)),
        Err(e) => Err(error_response(e)),
    }
}
