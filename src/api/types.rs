//! Shared API request and response types
//!
//! Every body leaves the server wrapped in the same envelope:
//!
//! ```json
//! { "status": "success", "result": ... }
//! ```
//!
//! Errors use `"status": "error"` with a `null` result and a `detail` message.

use serde::{Deserialize, Serialize};

use crate::actors::messages::RetentionStats;

/// Outcome marker of the envelope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseStatus::Success => write!(f, "success"),
            ResponseStatus::Error => write!(f, "error"),
        }
    }
}

/// Response envelope shared by all endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: ResponseStatus,
    pub result: T,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(result: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            result,
            detail: None,
        }
    }
}

impl Envelope<()> {
    /// Serializes with `"result": null`
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            result: (),
            detail: Some(detail.into()),
        }
    }
}

/// Query string carrying the device identifier
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQuery {
    pub device_id: Option<String>,
}

/// Query string for GET /api/v1/temperature/history
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub device_id: Option<String>,

    /// Max number of readings (default 50, capped at 1000)
    pub limit: Option<usize>,
}

/// Body of POST and PUT /api/v1/temperature/threshold
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdUpdate {
    pub device_id: Option<String>,
    pub threshold: Option<f64>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" if the storage backend reports unhealthy
    pub status: String,

    /// Current timestamp (RFC 3339)
    pub timestamp: String,

    /// Storage backend status message
    pub storage: String,
}

/// System statistics response
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Current timestamp (RFC 3339)
    pub timestamp: String,

    /// Human-readable storage backend summary
    pub storage: String,

    /// Retention sweep statistics, absent when no sweep actor runs
    pub retention: Option<RetentionStats>,
}
