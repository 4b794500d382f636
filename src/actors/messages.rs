//! Message types for actor communication

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::storage::StorageResult;

/// Commands that can be sent to the RetentionActor
#[derive(Debug)]
pub enum RetentionCommand {
    /// Run a sweep right away, using `now` as the reference instant
    SweepNow {
        now: DateTime<Utc>,
        respond_to: oneshot::Sender<StorageResult<SweepReport>>,
    },

    /// Get sweep statistics
    GetStats {
        respond_to: oneshot::Sender<RetentionStats>,
    },

    /// Gracefully shut down the retention actor
    Shutdown,
}

/// Result of a single sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub readings_deleted: usize,
    pub alerts_deleted: usize,

    /// Readings older than this were deleted
    pub readings_cutoff: DateTime<Utc>,

    /// Alerts resolved before this were deleted
    pub alerts_cutoff: DateTime<Utc>,
}

/// Retention statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionStats {
    /// Number of sweeps run, failed ones included
    pub sweep_count: u64,

    pub last_sweep: Option<DateTime<Utc>>,

    pub total_readings_deleted: u64,

    pub total_alerts_deleted: u64,

    /// Error of the most recent sweep, cleared by the next successful one
    pub last_error: Option<String>,
}
