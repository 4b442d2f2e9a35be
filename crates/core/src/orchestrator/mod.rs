//! Track orchestrator for the download pipeline.
//!
//! Drives tracks through the state machine automatically:
//! - **Search**: resolve a source watch URL (one job per worker at a time)
//! - **Download**: fetch and extract audio, reporting live progress
//! - **Tagging**: write title, artist, and cover art into the result

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{NewPlaylistTrack, TrackOrchestrator};
pub use types::{OrchestratorError, OrchestratorStatus};
