//! Track and playlist data model and persistence.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTrackStore;
pub use store::{NewPlaylist, NewTrack, TrackError, TrackStore, UpdateOutcome};
pub use types::{ErrorReason, Playlist, Track, TrackStatus};
