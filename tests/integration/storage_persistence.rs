//! Integration tests for SQLite persistence across restarts
//!
//! These tests verify that:
//! - Readings, thresholds and alerts survive reopening the database
//! - An alert opened before a restart is resolved after it
//! - The one-active-alert index is in place after migrations

use std::sync::Arc;

use chrono::Duration;
use fever_watch::actors::retention::sweep;
use fever_watch::config::{RetentionConfig, StorageConfig};
use fever_watch::monitors::alert::AlertTransition;
use fever_watch::storage::{NewAlert, StorageBackend, open_backend, sqlite::SqliteBackend};
use tempfile::tempdir;

use crate::helpers::{now_millis, pipeline, submission};

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("fever.db");
    let now = now_millis();

    {
        let p = pipeline(Arc::new(SqliteBackend::new(&db_path).await.unwrap()));
        p.thresholds.set("d1", 37.8, now).await.unwrap();
        p.ingest.ingest_at(submission("d1", 38.1, now), now).await.unwrap();
        p.backend.close().await.unwrap();
    }

    let p = pipeline(Arc::new(SqliteBackend::new(&db_path).await.unwrap()));

    let threshold = p.thresholds.current("d1").await.unwrap();
    assert_eq!(threshold.value, 37.8);
    assert_eq!(threshold.updated_at, Some(now));

    let latest = p.backend.latest_reading("d1").await.unwrap().unwrap();
    assert_eq!(latest.temperature, 38.1);
    assert_eq!(latest.timestamp, now);

    let active = p.backend.active_alert("d1").await.unwrap().unwrap();
    assert_eq!(active.threshold, 37.8);

    // the alert opened before the restart is the one that gets resolved
    let later = now + Duration::minutes(1);
    let ingestion = p.ingest.ingest_at(submission("d1", 37.0, later), later).await.unwrap();
    match ingestion.transition {
        AlertTransition::Resolved(alert) => assert_eq!(alert.id, active.id),
        other => panic!("expected resolution, got {other:?}"),
    }
}

#[tokio::test]
async fn test_alert_times_follow_ingestion_clock() {
    let dir = tempdir().unwrap();
    let p = pipeline(Arc::new(SqliteBackend::new(dir.path().join("fever.db")).await.unwrap()));
    let now = now_millis();
    let ahead = now + Duration::days(1);

    p.ingest.ingest_at(submission("d1", 39.0, ahead), now).await.unwrap();
    let active = p.backend.active_alert("d1").await.unwrap().unwrap();
    assert_eq!(active.timestamp, now);

    let ingestion = p.ingest.ingest_at(submission("d1", 37.0, now), now).await.unwrap();
    match ingestion.transition {
        AlertTransition::Resolved(alert) => {
            assert_eq!(alert.timestamp, now);
            assert_eq!(alert.resolved_at, Some(now));
        }
        other => panic!("expected resolution, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unique_active_alert_after_migrations() {
    let dir = tempdir().unwrap();
    let backend = SqliteBackend::new(dir.path().join("fever.db")).await.unwrap();
    let now = now_millis();

    assert!(backend.open_alert(NewAlert::new("d1", 39.0, 38.0, now)).await.unwrap().is_some());
    assert!(backend.open_alert(NewAlert::new("d1", 39.9, 38.0, now)).await.unwrap().is_none());

    backend.resolve_active_alert("d1", now).await.unwrap();
    assert!(backend.open_alert(NewAlert::new("d1", 40.0, 38.0, now)).await.unwrap().is_some());
    assert_eq!(backend.list_alerts("d1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_open_backend_from_config() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::Sqlite {
        path: dir.path().join("configured.db"),
    };

    let backend = open_backend(&config).await.unwrap();
    let health = backend.health_check().await.unwrap();
    assert!(health.healthy);
    assert!(dir.path().join("configured.db").exists());

    let memory = open_backend(&StorageConfig::None).await.unwrap();
    assert!(memory.get_stats().await.unwrap().starts_with("In-Memory"));
}

#[tokio::test]
async fn test_retention_sweep_on_disk() {
    let dir = tempdir().unwrap();
    let p = pipeline(Arc::new(SqliteBackend::new(dir.path().join("fever.db")).await.unwrap()));
    let now = now_millis();

    let old = now - Duration::days(40);
    p.ingest.ingest_at(submission("d1", 39.0, old), old).await.unwrap();
    p.ingest.ingest_at(submission("d1", 37.0, old), old).await.unwrap();
    p.ingest.ingest_at(submission("d1", 36.8, now), now).await.unwrap();

    let report = sweep(p.backend.as_ref(), &RetentionConfig::default(), now).await.unwrap();

    assert_eq!(report.readings_deleted, 2);
    assert_eq!(report.alerts_deleted, 1);
    assert_eq!(p.backend.query_readings("d1", 10).await.unwrap().len(), 1);
    assert!(p.backend.list_alerts("d1").await.unwrap().is_empty());
}
