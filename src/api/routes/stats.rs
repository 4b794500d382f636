//! System statistics endpoint

use axum::{Json, extract::State};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{Envelope, StatsResponse},
};

/// GET /api/v1/stats
///
/// Returns the storage summary and retention sweep statistics
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<Envelope<StatsResponse>>> {
    let storage = state.backend.get_stats().await?;

    let retention = match &state.retention {
        Some(handle) => handle.get_stats().await,
        None => None,
    };

    Ok(Json(Envelope::success(StatsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage,
        retention,
    })))
}
