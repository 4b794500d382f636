//! Threshold resolution
//!
//! Devices start without a stored threshold. Until one is set, the configured
//! default (38.0°C unless overridden) is used everywhere a threshold is needed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{FeverError, FeverResult};
use crate::storage::StorageBackend;
use crate::{TemperatureUnit, Threshold};

/// Threshold used for devices that never had one set
pub const DEFAULT_THRESHOLD_CELSIUS: f64 = 38.0;

/// The threshold in effect for a device
///
/// `updated_at` is `None` when the value is the default rather than a
/// stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdView {
    pub device_id: String,
    #[serde(rename = "threshold")]
    pub value: f64,
    pub unit: TemperatureUnit,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ThresholdView {
    pub fn is_default(&self) -> bool {
        self.updated_at.is_none()
    }
}

impl From<Threshold> for ThresholdView {
    fn from(threshold: Threshold) -> Self {
        Self {
            device_id: threshold.device_id,
            value: threshold.value,
            unit: threshold.unit,
            updated_at: Some(threshold.updated_at),
        }
    }
}

#[derive(Clone)]
pub struct ThresholdResolver {
    backend: Arc<dyn StorageBackend>,
    default_value: f64,
}

impl ThresholdResolver {
    pub fn new(backend: Arc<dyn StorageBackend>, default_value: f64) -> Self {
        Self {
            backend,
            default_value,
        }
    }

    /// Stored threshold value for the device, or the default. Absence is not an error.
    #[instrument(skip(self))]
    pub async fn resolve(&self, device_id: &str) -> FeverResult<f64> {
        Ok(self.current(device_id).await?.value)
    }

    pub async fn current(&self, device_id: &str) -> FeverResult<ThresholdView> {
        match self.backend.find_threshold(device_id).await? {
            Some(threshold) => {
                debug!("threshold for {device_id} is {}", threshold.value);
                Ok(threshold.into())
            }
            None => {
                debug!("no threshold for {device_id}, using default ({})", self.default_value);
                Ok(ThresholdView {
                    device_id: device_id.to_string(),
                    value: self.default_value,
                    unit: TemperatureUnit::Celsius,
                    updated_at: None,
                })
            }
        }
    }

    /// Insert or overwrite the device's threshold
    #[instrument(skip(self))]
    pub async fn set(&self, device_id: &str, value: f64, now: DateTime<Utc>) -> FeverResult<Threshold> {
        validate(device_id, value)?;

        let threshold = self.backend.upsert_threshold(device_id, value, now).await?;
        info!("threshold for {device_id} set to {value}");

        Ok(threshold)
    }

    /// Overwrite the device's threshold, failing if none was ever stored
    #[instrument(skip(self))]
    pub async fn update_existing(
        &self,
        device_id: &str,
        value: f64,
        now: DateTime<Utc>,
    ) -> FeverResult<Threshold> {
        validate(device_id, value)?;

        match self.backend.update_threshold(device_id, value, now).await? {
            Some(threshold) => {
                info!("threshold for {device_id} updated to {value}");
                Ok(threshold)
            }
            None => {
                warn!("device not found while updating threshold for {device_id}");
                Err(FeverError::NotFound {
                    entity: "threshold",
                    device_id: device_id.to_string(),
                })
            }
        }
    }
}

fn validate(device_id: &str, value: f64) -> FeverResult<()> {
    if device_id.trim().is_empty() {
        return Err(FeverError::Validation("deviceId must not be empty".to_string()));
    }
    if !value.is_finite() {
        return Err(FeverError::Validation(format!(
            "threshold must be a finite number, got {value}"
        )));
    }
    Ok(())
}
