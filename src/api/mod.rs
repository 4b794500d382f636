//! REST API of the fever hub
//!
//! This module exposes ingestion, status, history, threshold and alert
//! queries over HTTP.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Core components** (ingestion, status, thresholds) shared through [`ApiState`]
//! - **Retention handle** for sweep statistics
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome message
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/stats` - Storage and retention statistics
//! - `POST /api/v1/temperature` - Submit a reading
//! - `GET /api/v1/temperature/latest?deviceId=` - Latest reading
//! - `GET /api/v1/temperature/history?deviceId=&limit=` - Reading history
//! - `GET /api/v1/temperature/status?deviceId=` - Live status
//! - `GET|POST|PUT /api/v1/temperature/threshold` - Read, upsert, update a threshold
//! - `GET /api/v1/temperature/alerts?deviceId=` - Fever alerts

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{Envelope, HealthResponse, StatsResponse};

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiConfig;

/// Build the router with all routes and layers
pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    let mut app = Router::new()
        .route("/", get(routes::health::welcome))
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route(
            "/api/v1/temperature",
            post(routes::temperature::submit_reading),
        )
        .route(
            "/api/v1/temperature/latest",
            get(routes::temperature::get_latest),
        )
        .route(
            "/api/v1/temperature/history",
            get(routes::temperature::get_history),
        )
        .route(
            "/api/v1/temperature/status",
            get(routes::temperature::get_status),
        )
        .route(
            "/api/v1/temperature/threshold",
            get(routes::temperature::get_threshold)
                .post(routes::temperature::set_threshold)
                .put(routes::temperature::update_threshold),
        )
        .route(
            "/api/v1/temperature/alerts",
            get(routes::temperature::get_alerts),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Add auth middleware if token provided
    if let Some(token) = config.auth_token.as_deref() {
        app = app.layer(axum::middleware::from_fn_with_state(
            middleware::auth::ApiToken::new(token),
            middleware::auth::require_token,
        ));
    }

    // CORS wraps auth so preflight requests are answered without a token
    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
