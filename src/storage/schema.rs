//! Record definitions shared by the storage backends
//!
//! Three logical record sets are kept:
//!
//! - `readings`: append-only temperature observations, indexed on
//!   `(device_id, timestamp DESC)` for latest/history lookups
//! - `thresholds`: one row per device, upserted in place
//! - `fever_alerts`: at most one row with `resolved = 0` per device
//!
//! All instants are UTC. The SQLite backend stores them as Unix milliseconds.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::FeverAlert;

/// An alert that has not been written yet
///
/// Backends turn this into a [`FeverAlert`] only if the device has no
/// unresolved alert at the moment of the write.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub device_id: String,
    pub temperature: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

impl NewAlert {
    pub fn new(
        device_id: impl Into<String>,
        temperature: f64,
        threshold: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            temperature,
            threshold,
            timestamp,
        }
    }

    /// Materialize the alert with a fresh identifier
    pub fn into_alert(self) -> FeverAlert {
        FeverAlert {
            id: Uuid::new_v4().to_string(),
            device_id: self.device_id,
            temperature: self.temperature,
            threshold: self.threshold,
            timestamp: self.timestamp,
            resolved: false,
            resolved_at: None,
        }
    }
}
