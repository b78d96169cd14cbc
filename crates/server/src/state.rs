use batchgen_core::{BatchOrchestrator, CampaignStore, Config, SanitizedConfig};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn CampaignStore>,
    /// Absent when no generator backend is configured.
    orchestrator: Option<BatchOrchestrator>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn CampaignStore>,
        orchestrator: Option<BatchOrchestrator>,
    ) -> Self {
        Self {
            config,
            store,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn CampaignStore {
        self.store.as_ref()
    }

    pub fn orchestrator(&self) -> Option<&BatchOrchestrator> {
        self.orchestrator.as_ref()
    }
}
