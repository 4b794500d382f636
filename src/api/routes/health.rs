//! Welcome and health check endpoints

use axum::{Json, extract::State};

use crate::api::{state::ApiState, types::Envelope, types::HealthResponse};

/// GET /
pub async fn welcome() -> Json<Envelope<&'static str>> {
    Json(Envelope::success("Welcome to Temperature API"))
}

/// GET /api/v1/health
///
/// Reports "degraded" instead of failing when the storage backend is unhealthy
pub async fn health_check(State(state): State<ApiState>) -> Json<Envelope<HealthResponse>> {
    let (status, storage) = match state.backend.health_check().await {
        Ok(health) if health.healthy => ("ok", health.message),
        Ok(health) => ("degraded", health.message),
        Err(e) => ("degraded", e.to_string()),
    };

    Json(Envelope::success(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage,
    }))
}
