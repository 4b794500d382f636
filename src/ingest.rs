//! Ingestion of incoming readings
//!
//! One reading is one unit of work: persist it, resolve the device's
//! threshold, run the alert state machine, acknowledge. A reading that has
//! been stored stays stored even when the alert step fails afterwards, so a
//! failed submission does not imply the reading was dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::error::{FeverError, FeverResult};
use crate::monitors::alert::{AlertStateMachine, AlertTransition};
use crate::monitors::threshold::ThresholdResolver;
use crate::storage::StorageBackend;
use crate::{Reading, TemperatureUnit};

/// A reading as submitted by a device
///
/// Fields are optional on the wire so that missing ones surface as a
/// validation error instead of a decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSubmission {
    pub device_id: Option<String>,
    pub temperature: Option<f64>,

    /// RFC 3339; defaults to the ingestion time
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReadingSubmission {
    pub fn new(device_id: impl Into<String>, temperature: f64) -> Self {
        Self {
            device_id: Some(device_id.into()),
            temperature: Some(temperature),
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Check the submission and turn it into a reading stamped at `now` if
    /// it carries no timestamp of its own
    pub fn validate(self, now: DateTime<Utc>) -> FeverResult<Reading> {
        let device_id = self
            .device_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FeverError::Validation("deviceId is required".to_string()))?;

        let temperature = self
            .temperature
            .ok_or_else(|| FeverError::Validation("temperature is required".to_string()))?;

        if !temperature.is_finite() {
            return Err(FeverError::Validation(format!(
                "temperature must be a finite number, got {temperature}"
            )));
        }

        Ok(Reading {
            device_id,
            temperature,
            timestamp: self.timestamp.unwrap_or(now),
        })
    }
}

/// Acknowledgment echoing the accepted reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingAck {
    pub device_id: String,
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
    pub unit: TemperatureUnit,
}

impl From<&Reading> for ReadingAck {
    fn from(reading: &Reading) -> Self {
        Self {
            device_id: reading.device_id.clone(),
            temperature: reading.temperature,
            timestamp: reading.timestamp,
            unit: TemperatureUnit::Celsius,
        }
    }
}

/// Outcome of one ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct Ingestion {
    pub ack: ReadingAck,
    pub transition: AlertTransition,
}

#[derive(Clone)]
pub struct IngestionOrchestrator {
    backend: Arc<dyn StorageBackend>,
    thresholds: ThresholdResolver,
    alerts: AlertStateMachine,
}

impl IngestionOrchestrator {
    pub fn new(backend: Arc<dyn StorageBackend>, thresholds: ThresholdResolver) -> Self {
        Self {
            alerts: AlertStateMachine::new(backend.clone()),
            backend,
            thresholds,
        }
    }

    pub async fn ingest(&self, submission: ReadingSubmission) -> FeverResult<Ingestion> {
        self.ingest_at(submission, Utc::now()).await
    }

    #[instrument(skip(self, submission))]
    pub async fn ingest_at(
        &self,
        submission: ReadingSubmission,
        now: DateTime<Utc>,
    ) -> FeverResult<Ingestion> {
        let reading = submission.validate(now)?;

        self.backend.insert_reading(&reading).await?;
        debug!(
            "stored reading {:.1}°C for {} at {}",
            reading.temperature, reading.device_id, reading.timestamp
        );

        let transition = self.evaluate(&reading, now).await.inspect_err(|e| {
            error!(
                "alert evaluation failed for {} after the reading was stored: {e}",
                reading.device_id
            )
        })?;

        Ok(Ingestion {
            ack: ReadingAck::from(&reading),
            transition,
        })
    }

    async fn evaluate(&self, reading: &Reading, now: DateTime<Utc>) -> FeverResult<AlertTransition> {
        let threshold = self.thresholds.resolve(&reading.device_id).await?;
        self.alerts.apply(reading, threshold, now).await
    }
}
