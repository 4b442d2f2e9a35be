pub mod config;
pub mod downloader;
pub mod events;
pub mod layout;
pub mod orchestrator;
pub mod queue;
pub mod searcher;
pub mod tagger;
pub mod testing;
pub mod track;

pub use config::{
    load_config, load_config_from_str, validate_config, AudioFormat, Config, ConfigError,
    SanitizedConfig,
};
pub use events::{EventBus, TrackEvent};
pub use orchestrator::{OrchestratorConfig, OrchestratorError, TrackOrchestrator};
pub use track::{ErrorReason, Playlist, Track, TrackStatus, TrackStore};
