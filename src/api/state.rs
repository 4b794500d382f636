//! API shared state

use std::sync::Arc;
use std::time::Duration;

use crate::actors::retention::RetentionHandle;
use crate::config::Config;
use crate::ingest::IngestionOrchestrator;
use crate::monitors::status::StatusEvaluator;
use crate::monitors::threshold::ThresholdResolver;
use crate::storage::StorageBackend;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Storage backend for direct history, latest and alert queries
    pub backend: Arc<dyn StorageBackend>,

    pub ingest: IngestionOrchestrator,

    pub status: StatusEvaluator,

    pub thresholds: ThresholdResolver,

    /// Handle to the retention actor, if one is running
    pub retention: Option<RetentionHandle>,
}

impl ApiState {
    /// Wire the core components around one backend
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        config: &Config,
        retention: Option<RetentionHandle>,
    ) -> Self {
        let thresholds = ThresholdResolver::new(backend.clone(), config.thresholds.default_celsius);
        let status = StatusEvaluator::new(
            backend.clone(),
            thresholds.clone(),
            Duration::from_secs(config.status.freshness_secs),
        );
        let ingest = IngestionOrchestrator::new(backend.clone(), thresholds.clone());

        Self {
            backend,
            ingest,
            status,
            thresholds,
            retention,
        }
    }
}
