//! Core track and playlist data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a track.
///
/// State machine flow:
/// ```text
/// New -> Searching -> {Queued, Error} -> Downloading -> {Completed, Error}
/// ```
/// Error and Completed are terminal. Error may be re-entered via an explicit
/// retry, which resets the track to New and re-enqueues a search job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    /// Track created, waiting for the search worker.
    New,
    /// Search stage is resolving a source URL.
    Searching,
    /// Source URL resolved, waiting for the download worker.
    Queued,
    /// Download stage is streaming audio.
    Downloading,
    /// Audio downloaded and tagged (terminal).
    Completed,
    /// A stage failed or the user cancelled (terminal).
    Error,
}

impl TrackStatus {
    /// Returns true if no further transitions are expected (retry excepted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackStatus::Completed | TrackStatus::Error)
    }

    /// Returns the status as a string (for filtering and storage).
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::New => "new",
            TrackStatus::Searching => "searching",
            TrackStatus::Queued => "queued",
            TrackStatus::Downloading => "downloading",
            TrackStatus::Completed => "completed",
            TrackStatus::Error => "error",
        }
    }

    /// Parses a stored status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(TrackStatus::New),
            "searching" => Some(TrackStatus::Searching),
            "queued" => Some(TrackStatus::Queued),
            "downloading" => Some(TrackStatus::Downloading),
            "completed" => Some(TrackStatus::Completed),
            "error" => Some(TrackStatus::Error),
            _ => None,
        }
    }
}

/// Why a track ended up in Error status.
///
/// `ForcedFailure` and `StoppedByUser` are authoritative user-cancellation
/// signals: once persisted, late progress callbacks and stale stage results
/// must never overwrite the track's status or error fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    /// User aborted a single in-flight track deterministically.
    ForcedFailure,
    /// User stopped the whole playlist.
    StoppedByUser,
    /// A pipeline stage failed (search, download, tagging, or timeout).
    Stage,
}

impl ErrorReason {
    /// Returns true for the privileged user-cancellation reasons.
    pub fn is_user_cancellation(&self) -> bool {
        matches!(self, ErrorReason::ForcedFailure | ErrorReason::StoppedByUser)
    }

    /// Returns the reason as a string (for storage).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::ForcedFailure => "forced_failure",
            ErrorReason::StoppedByUser => "stopped_by_user",
            ErrorReason::Stage => "stage",
        }
    }

    /// Parses a stored reason string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "forced_failure" => Some(ErrorReason::ForcedFailure),
            "stopped_by_user" => Some(ErrorReason::StoppedByUser),
            "stage" => Some(ErrorReason::Stage),
            _ => None,
        }
    }
}

/// A track moving through the download pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Store-assigned identifier.
    pub id: i64,

    pub artist: String,

    pub name: String,

    /// Resolved source watch URL, set by the search stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    pub status: TrackStatus,

    /// Download progress 0-100. Only meaningful while status is Downloading;
    /// monotonically non-decreasing within a single download attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,

    /// Human-readable failure message when status is Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Structured reason behind an Error status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<ErrorReason>,

    /// Cover art URL; overrides the playlist's cover when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,

    /// Owning playlist; None means "ungrouped".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<i64>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Track {
    /// Returns true if the track carries a user-cancellation Error.
    ///
    /// This is the guard consulted by progress callbacks and final stage
    /// writes: a user's terminal decision wins over stale in-flight results.
    pub fn is_user_stopped(&self) -> bool {
        self.status == TrackStatus::Error
            && self
                .error_reason
                .is_some_and(|r| r.is_user_cancellation())
    }
}

/// A playlist grouping tracks and providing download defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// Store-assigned identifier.
    pub id: i64,

    pub name: String,

    /// Default cover art for tracks without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,

    /// True for single-track requests: the file goes directly under the
    /// downloads root instead of a playlist subfolder.
    #[serde(default)]
    pub is_track: bool,
}
