pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod monitors;
pub mod storage;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit every temperature in the system is expressed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
        }
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single temperature observation. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub device_id: String,
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-device comparison value, at most one per device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    pub device_id: String,
    #[serde(rename = "threshold")]
    pub value: f64,
    pub unit: TemperatureUnit,
    pub updated_at: DateTime<Utc>,
}

/// Record spanning the period a device was observed at or above its threshold.
///
/// `temperature` and `threshold` are snapshots taken when the alert opened and
/// are never touched afterwards; only `resolved` and `resolved_at` change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeverAlert {
    pub id: String,
    pub device_id: String,
    pub temperature: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FeverAlert {
    pub fn is_active(&self) -> bool {
        !self.resolved
    }
}
