//! Types for the track orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::queue::QueueError;
use crate::track::TrackError;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Track not found.
    #[error("Track not found: {0}")]
    TrackNotFound(i64),

    /// Playlist not found.
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(i64),

    /// Store failure.
    #[error("Store error: {0}")]
    Store(#[from] TrackError),

    /// Queue failure.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Snapshot of the orchestrator's runtime state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestratorStatus {
    pub running: bool,
    pub pending_searches: usize,
    pub pending_downloads: usize,
}
