//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - All REST endpoints return the `{status, result}` envelope
//! - Validation, not-found and auth failures map to the right status codes
//! - The threshold upsert and update contracts differ only for unknown devices

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use fever_watch::{
    actors::retention::RetentionHandle,
    api::{ApiState, spawn_api_server},
    config::{ApiConfig, Config, RetentionConfig},
    storage::{StorageBackend, memory::MemoryBackend},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

const TOKEN: &str = "test-token";

struct TestApi {
    addr: SocketAddr,
    client: reqwest::Client,
    backend: Arc<dyn StorageBackend>,
}

impl TestApi {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).bearer_auth(TOKEN).send().await.unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .request(method, self.url(path))
            .bearer_auth(TOKEN)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PUT, path, body).await
    }
}

// Helper to create test API server
async fn spawn_test_api() -> TestApi {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
    let retention = RetentionHandle::spawn(
        backend.clone(),
        RetentionConfig {
            enabled: false,
            ..RetentionConfig::default()
        },
    );
    let state = ApiState::new(backend.clone(), &Config::default(), Some(retention));

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        auth_token: Some(TOKEN.to_string()),
        enable_cors: true,
    };

    let addr = spawn_api_server(config, state).await.unwrap();

    TestApi {
        addr,
        client: reqwest::Client::new(),
        backend,
    }
}

#[tokio::test]
async fn test_welcome_and_health() {
    let api = spawn_test_api().await;

    let (status, body) = api.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success", "result": "Welcome to Temperature API" }));

    let (status, body) = api.get("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["status"], "ok");
}

#[tokio::test]
async fn test_auth_required() {
    let api = spawn_test_api().await;

    let response = api.client.get(api.url("/api/v1/health")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = api
        .client
        .get(api.url("/api/v1/health"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_submit_reading_flow() {
    let api = spawn_test_api().await;
    let now = Utc::now();

    let (status, body) = api
        .post(
            "/api/v1/temperature",
            json!({ "deviceId": "d1", "temperature": 37.0, "timestamp": now }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["result"]["deviceId"], "d1");
    assert_eq!(body["result"]["temperature"], 37.0);
    assert_eq!(body["result"]["unit"], "celsius");

    let (_, body) = api.get("/api/v1/temperature/status?deviceId=d1").await;
    assert_eq!(body["result"]["status"], "normal");
    assert_eq!(body["result"]["threshold"], 38.0);

    api.post(
        "/api/v1/temperature",
        json!({ "deviceId": "d1", "temperature": 39.0, "timestamp": now + Duration::seconds(1) }),
    )
    .await;

    let (_, body) = api.get("/api/v1/temperature/status?deviceId=d1").await;
    assert_eq!(body["result"]["status"], "fever");
    assert_eq!(body["result"]["currentTemperature"], 39.0);

    let (_, body) = api.get("/api/v1/temperature/alerts?deviceId=d1").await;
    let alerts = body["result"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["temperature"], 39.0);
    assert_eq!(alerts[0]["threshold"], 38.0);
    assert_eq!(alerts[0]["resolved"], false);
    assert_eq!(alerts[0]["resolvedAt"], Value::Null);

    let (_, body) = api.get("/api/v1/temperature/latest?deviceId=d1").await;
    assert_eq!(body["result"]["temperature"], 39.0);

    let (_, body) = api.get("/api/v1/temperature/history?deviceId=d1&limit=1").await;
    assert_eq!(body["result"].as_array().unwrap().len(), 1);
    let (_, body) = api.get("/api/v1/temperature/history?deviceId=d1").await;
    assert_eq!(body["result"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_reading_without_timestamp_is_accepted() {
    let api = spawn_test_api().await;

    let (status, body) = api
        .post("/api/v1/temperature", json!({ "deviceId": "d1", "temperature": 36.7 }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["result"]["timestamp"].is_string());
    assert!(api.backend.latest_reading("d1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_invalid_readings_rejected() {
    let api = spawn_test_api().await;

    let (status, body) = api
        .post("/api/v1/temperature", json!({ "temperature": 37.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["result"], Value::Null);

    let (status, _) = api
        .post("/api/v1/temperature", json!({ "deviceId": "d1", "temperature": "hot" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api
        .post(
            "/api/v1/temperature",
            json!({ "deviceId": "d1", "temperature": 37.0, "timestamp": "yesterday" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(api.backend.latest_reading("d1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_queries_without_device_id_rejected() {
    let api = spawn_test_api().await;

    for path in [
        "/api/v1/temperature/latest",
        "/api/v1/temperature/status",
        "/api/v1/temperature/threshold",
        "/api/v1/temperature/alerts",
        "/api/v1/temperature/history?limit=abc",
    ] {
        let (status, body) = api.get(path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body["status"], "error");
    }
}

#[tokio::test]
async fn test_unknown_device_queries() {
    let api = spawn_test_api().await;

    let (status, body) = api.get("/api/v1/temperature/status?deviceId=ghost").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!({ "status": "unknown" }));

    let (_, body) = api.get("/api/v1/temperature/latest?deviceId=ghost").await;
    assert_eq!(body, json!({ "status": "success", "result": null }));

    let (_, body) = api.get("/api/v1/temperature/alerts?deviceId=ghost").await;
    assert_eq!(body["result"], json!([]));

    let (_, body) = api.get("/api/v1/temperature/threshold?deviceId=ghost").await;
    assert_eq!(
        body["result"],
        json!({ "deviceId": "ghost", "threshold": 38.0, "unit": "celsius", "updatedAt": null })
    );
}

#[tokio::test]
async fn test_threshold_contracts() {
    let api = spawn_test_api().await;

    // update of an unknown device is not found
    let (status, body) = api
        .put(
            "/api/v1/temperature/threshold",
            json!({ "deviceId": "d1", "threshold": 37.5 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");

    // upsert creates it
    let (status, body) = api
        .post(
            "/api/v1/temperature/threshold",
            json!({ "deviceId": "d1", "threshold": 37.5 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["threshold"], 37.5);
    assert_eq!(body["result"]["unit"], "celsius");
    assert!(body["result"]["updatedAt"].is_string());

    // now the update succeeds
    let (status, body) = api
        .put(
            "/api/v1/temperature/threshold",
            json!({ "deviceId": "d1", "threshold": 37.9 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["threshold"], 37.9);

    let (_, body) = api.get("/api/v1/temperature/threshold?deviceId=d1").await;
    assert_eq!(body["result"]["threshold"], 37.9);

    let (status, _) = api
        .post("/api/v1/temperature/threshold", json!({ "deviceId": "d1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_include_retention() {
    let api = spawn_test_api().await;

    let (status, body) = api.get("/api/v1/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["result"]["storage"].as_str().unwrap().starts_with("In-Memory"));
    assert_eq!(body["result"]["retention"]["sweep_count"], 0);
}
