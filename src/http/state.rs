//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::services::alert_engine::{AlertEngine, AlertEngineConfig};
use crate::services::replay::ReplayTracker;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for storage operations
    pub repository: Arc<dyn FullRepository>,
    /// Alert decision engine shared by ingestion and replay
    pub engine: Arc<AlertEngine>,
    /// Background replay tracker
    pub replay: ReplayTracker,
}

impl AppState {
    /// Create a new application state with default engine tunables.
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self::with_engine_config(repository, AlertEngineConfig::default())
    }

    /// Create a new application state with explicit engine tunables.
    pub fn with_engine_config(
        repository: Arc<dyn FullRepository>,
        config: AlertEngineConfig,
    ) -> Self {
        Self {
            repository,
            engine: Arc::new(AlertEngine::new(config)),
            replay: ReplayTracker::new(),
        }
    }
}
