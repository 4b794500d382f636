//! Temperature endpoints
//!
//! Every endpoint identifies the device through `deviceId`, in the query
//! string for reads and in the JSON body for writes.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use chrono::Utc;
use tracing::debug;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{DeviceQuery, Envelope, HistoryQuery, ThresholdUpdate},
};
use crate::ingest::{ReadingAck, ReadingSubmission};
use crate::monitors::status::DeviceStatus;
use crate::monitors::threshold::ThresholdView;
use crate::{FeverAlert, Reading, Threshold};

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 1000;

fn require_device_id(device_id: Option<String>) -> ApiResult<String> {
    device_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("deviceId is required".to_string()))
}

/// POST /api/v1/temperature
///
/// Store a reading and run the alert state machine on it
pub async fn submit_reading(
    State(state): State<ApiState>,
    payload: Result<Json<ReadingSubmission>, JsonRejection>,
) -> ApiResult<Json<Envelope<ReadingAck>>> {
    let Json(submission) = payload?;
    debug!("received reading {:?}", submission);

    let ingestion = state.ingest.ingest(submission).await?;

    Ok(Json(Envelope::success(ingestion.ack)))
}

/// GET /api/v1/temperature/latest
///
/// `result` is null when the device never reported
pub async fn get_latest(
    State(state): State<ApiState>,
    query: Result<Query<DeviceQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Option<Reading>>>> {
    let Query(query) = query?;
    let device_id = require_device_id(query.device_id)?;

    let reading = state.backend.latest_reading(&device_id).await?;
    if reading.is_none() {
        debug!("no reading found for {device_id}");
    }

    Ok(Json(Envelope::success(reading)))
}

/// GET /api/v1/temperature/history
///
/// Newest readings first
pub async fn get_history(
    State(state): State<ApiState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<Reading>>>> {
    let Query(query) = query?;
    let device_id = require_device_id(query.device_id)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);

    let readings = state.backend.query_readings(&device_id, limit).await?;
    debug!("fetched {} readings for {device_id}", readings.len());

    Ok(Json(Envelope::success(readings)))
}

/// GET /api/v1/temperature/status
pub async fn get_status(
    State(state): State<ApiState>,
    query: Result<Query<DeviceQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<DeviceStatus>>> {
    let Query(query) = query?;
    let device_id = require_device_id(query.device_id)?;

    let status = state.status.evaluate(&device_id).await?;

    Ok(Json(Envelope::success(status)))
}

/// GET /api/v1/temperature/threshold
///
/// Falls back to the default threshold with `updatedAt: null`
pub async fn get_threshold(
    State(state): State<ApiState>,
    query: Result<Query<DeviceQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<ThresholdView>>> {
    let Query(query) = query?;
    let device_id = require_device_id(query.device_id)?;

    let threshold = state.thresholds.current(&device_id).await?;

    Ok(Json(Envelope::success(threshold)))
}

fn parse_update(payload: Result<Json<ThresholdUpdate>, JsonRejection>) -> ApiResult<(String, f64)> {
    let Json(update) = payload?;
    let device_id = require_device_id(update.device_id)?;
    let value = update
        .threshold
        .ok_or_else(|| ApiError::InvalidRequest("threshold is required".to_string()))?;

    Ok((device_id, value))
}

/// POST /api/v1/temperature/threshold
///
/// Create or overwrite the device's threshold
pub async fn set_threshold(
    State(state): State<ApiState>,
    payload: Result<Json<ThresholdUpdate>, JsonRejection>,
) -> ApiResult<Json<Envelope<Threshold>>> {
    let (device_id, value) = parse_update(payload)?;

    let threshold = state.thresholds.set(&device_id, value, Utc::now()).await?;

    Ok(Json(Envelope::success(threshold)))
}

/// PUT /api/v1/temperature/threshold
///
/// Overwrite an existing threshold; 404 if the device has none
pub async fn update_threshold(
    State(state): State<ApiState>,
    payload: Result<Json<ThresholdUpdate>, JsonRejection>,
) -> ApiResult<Json<Envelope<Threshold>>> {
    let (device_id, value) = parse_update(payload)?;

    let threshold = state
        .thresholds
        .update_existing(&device_id, value, Utc::now())
        .await?;

    Ok(Json(Envelope::success(threshold)))
}

/// GET /api/v1/temperature/alerts
///
/// All alerts of the device, newest first
pub async fn get_alerts(
    State(state): State<ApiState>,
    query: Result<Query<DeviceQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<FeverAlert>>>> {
    let Query(query) = query?;
    let device_id = require_device_id(query.device_id)?;

    let alerts = state.backend.list_alerts(&device_id).await?;
    debug!("fetched {} alerts for {device_id}", alerts.len());

    Ok(Json(Envelope::success(alerts)))
}
