use hivemind_core::{Config, ResourceFinder, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    finder: ResourceFinder,
}

impl AppState {
    pub fn new(config: Config, finder: ResourceFinder) -> Self {
        Self { config, finder }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn finder(&self) -> &ResourceFinder {
        &self.finder
    }
}
