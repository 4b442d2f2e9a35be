use std::sync::Arc;

use spooty_core::{Config, EventBus, SanitizedConfig, TrackOrchestrator, TrackStore};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<TrackOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<TrackOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<TrackOrchestrator> {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<dyn TrackStore> {
        self.orchestrator.store()
    }

    pub fn events(&self) -> &EventBus {
        self.orchestrator.events()
    }
}
