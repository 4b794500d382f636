//! Live device status
//!
//! A device is only reported as `fever` or `normal` while its latest reading
//! is fresh. Once the reading falls out of the freshness window the status
//! becomes `unknown`, whatever the temperature was.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::alert::AlertCondition;
use super::threshold::ThresholdResolver;
use crate::error::FeverResult;
use crate::storage::StorageBackend;

/// Latest reading must be at most this old to count as live
pub const DEFAULT_FRESHNESS_SECS: u64 = 300;

/// Health status for devices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceHealth {
    /// Latest reading is live and at or above the threshold
    Fever,
    /// Latest reading is live and below the threshold
    Normal,
    /// No reading, or the latest one is stale
    Unknown,
}

impl std::fmt::Display for DeviceHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DeviceHealth {
    /// Get the string representation (lowercase)
    ///
    /// This matches the serde serialization format.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceHealth::Fever => "fever",
            DeviceHealth::Normal => "normal",
            DeviceHealth::Unknown => "unknown",
        }
    }
}

impl From<AlertCondition> for DeviceHealth {
    fn from(condition: AlertCondition) -> Self {
        match condition {
            AlertCondition::Fever => DeviceHealth::Fever,
            AlertCondition::Normal => DeviceHealth::Normal,
        }
    }
}

/// Status as returned by GET /api/v1/temperature/status
///
/// A device that never reported serializes as `{"status": "unknown"}` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub status: DeviceHealth,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_temperature: Option<f64>,

    /// Threshold the temperature was compared against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    /// Timestamp of the reading the status is based on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl DeviceStatus {
    pub fn unknown() -> Self {
        Self {
            status: DeviceHealth::Unknown,
            device_id: None,
            current_temperature: None,
            threshold: None,
            last_updated: None,
        }
    }
}

#[derive(Clone)]
pub struct StatusEvaluator {
    backend: Arc<dyn StorageBackend>,
    thresholds: ThresholdResolver,
    freshness: Duration,
}

impl StatusEvaluator {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        thresholds: ThresholdResolver,
        freshness: std::time::Duration,
    ) -> Self {
        Self {
            backend,
            thresholds,
            freshness: Duration::from_std(freshness)
                .unwrap_or_else(|_| Duration::seconds(DEFAULT_FRESHNESS_SECS as i64)),
        }
    }

    pub async fn evaluate(&self, device_id: &str) -> FeverResult<DeviceStatus> {
        self.evaluate_at(device_id, Utc::now()).await
    }

    /// Status of the device as seen at `now`
    #[instrument(skip(self))]
    pub async fn evaluate_at(&self, device_id: &str, now: DateTime<Utc>) -> FeverResult<DeviceStatus> {
        let Some(reading) = self.backend.latest_reading(device_id).await? else {
            debug!("no readings for {device_id}");
            return Ok(DeviceStatus::unknown());
        };

        let threshold = self.thresholds.resolve(device_id).await?;

        let status = if is_live(reading.timestamp, now, self.freshness) {
            AlertCondition::evaluate(reading.temperature, threshold).into()
        } else {
            debug!(
                "latest reading for {device_id} is stale ({} > {}s old)",
                reading.timestamp,
                self.freshness.num_seconds()
            );
            DeviceHealth::Unknown
        };

        Ok(DeviceStatus {
            status,
            device_id: Some(reading.device_id),
            current_temperature: Some(reading.temperature),
            threshold: Some(threshold),
            last_updated: Some(reading.timestamp),
        })
    }
}

/// The window is inclusive: a reading exactly `freshness` old is still live.
/// Readings stamped in the future count as live.
fn is_live(timestamp: DateTime<Utc>, now: DateTime<Utc>, freshness: Duration) -> bool {
    timestamp >= now - freshness
}
