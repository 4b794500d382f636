//! Fever alert state machine
//!
//! Each device is either without an unresolved alert (NONE) or has exactly
//! one (ACTIVE):
//!
//! ```text
//! NONE   + temperature >= threshold → open alert     → ACTIVE
//! NONE   + temperature <  threshold → nothing        → NONE
//! ACTIVE + temperature >= threshold → nothing        → ACTIVE
//! ACTIVE + temperature <  threshold → resolve alert  → NONE
//! ```
//!
//! The state itself lives in storage. Both transitions are single conditional
//! writes there, so concurrent readings for one device can never open a second
//! alert or resolve the same alert twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::error::FeverResult;
use crate::storage::{NewAlert, StorageBackend};
use crate::{FeverAlert, Reading};

/// Which side of the threshold a temperature falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCondition {
    Fever,
    Normal,
}

impl AlertCondition {
    /// A reading exactly at the threshold counts as fever.
    pub fn evaluate(temperature: f64, threshold: f64) -> AlertCondition {
        if temperature >= threshold {
            return AlertCondition::Fever;
        }

        AlertCondition::Normal
    }

    pub fn is_fever(&self) -> bool {
        matches!(self, AlertCondition::Fever)
    }
}

/// What a reading did to the device's alert
#[derive(Debug, Clone, PartialEq)]
pub enum AlertTransition {
    /// A new alert was opened for this reading
    Opened(FeverAlert),

    /// The previously active alert was resolved
    Resolved(FeverAlert),

    Unchanged,
}

impl AlertTransition {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, AlertTransition::Unchanged)
    }
}

#[derive(Clone)]
pub struct AlertStateMachine {
    backend: Arc<dyn StorageBackend>,
}

impl AlertStateMachine {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Apply one reading against the threshold in effect for its device
    ///
    /// `now` is the ingestion instant. It stamps an opened alert and resolves
    /// an active one, whatever time the device put on the reading.
    #[instrument(skip(self, reading), fields(device_id = %reading.device_id))]
    pub async fn apply(
        &self,
        reading: &Reading,
        threshold: f64,
        now: DateTime<Utc>,
    ) -> FeverResult<AlertTransition> {
        let transition = match AlertCondition::evaluate(reading.temperature, threshold) {
            AlertCondition::Fever => {
                let alert = NewAlert::new(
                    reading.device_id.clone(),
                    reading.temperature,
                    threshold,
                    now,
                );

                match self.backend.open_alert(alert).await? {
                    Some(alert) => {
                        info!(
                            "fever alert {} opened for {} ({:.1}°C >= {:.1}°C)",
                            alert.id, alert.device_id, alert.temperature, alert.threshold
                        );
                        AlertTransition::Opened(alert)
                    }
                    None => {
                        debug!("{} already has an active alert", reading.device_id);
                        AlertTransition::Unchanged
                    }
                }
            }
            AlertCondition::Normal => {
                match self.backend.resolve_active_alert(&reading.device_id, now).await? {
                    Some(alert) => {
                        info!(
                            "fever alert {} resolved for {} ({:.1}°C < {:.1}°C)",
                            alert.id, alert.device_id, reading.temperature, threshold
                        );
                        AlertTransition::Resolved(alert)
                    }
                    None => AlertTransition::Unchanged,
                }
            }
        };

        Ok(transition)
    }
}
