//! Concurrency and race condition tests
//!
//! These tests verify that concurrent readings for one device can never:
//! - open more than one unresolved alert
//! - resolve the same alert twice
//!
//! and that the retention sweep runs alongside ingestion without blocking it.

use chrono::Duration;
use fever_watch::monitors::alert::AlertTransition;
use futures::future::join_all;

use crate::helpers::{Pipeline, memory_pipeline, now_millis, submission};

const WRITERS: usize = 32;

async fn concurrent_fever_readings_open_one_alert(p: &Pipeline) {
    let now = now_millis();

    let tasks = (0..WRITERS).map(|i| {
        let p = p.clone();
        tokio::spawn(async move {
            p.ingest
                .ingest_at(submission("d1", 38.5 + i as f64 * 0.01, now), now)
                .await
        })
    });

    let opened = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .filter(|ingestion| matches!(ingestion.transition, AlertTransition::Opened(_)))
        .count();

    assert_eq!(opened, 1);

    let alerts = p.backend.list_alerts("d1").await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(!alerts[0].resolved);

    // every reading was stored
    assert_eq!(p.backend.query_readings("d1", 1000).await.unwrap().len(), WRITERS);
}

async fn concurrent_normal_readings_resolve_once(p: &Pipeline) {
    let now = now_millis();
    p.ingest.ingest_at(submission("d1", 39.0, now), now).await.unwrap();

    let later = now + Duration::seconds(1);
    let tasks = (0..WRITERS).map(|_| {
        let p = p.clone();
        tokio::spawn(async move { p.ingest.ingest_at(submission("d1", 36.5, later), later).await })
    });

    let resolved = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .filter(|ingestion| matches!(ingestion.transition, AlertTransition::Resolved(_)))
        .count();

    assert_eq!(resolved, 1);
    assert!(p.backend.active_alert("d1").await.unwrap().is_none());
}

async fn devices_do_not_interfere(p: &Pipeline) {
    let now = now_millis();

    let tasks = (0..WRITERS).map(|i| {
        let p = p.clone();
        let device = format!("device-{}", i % 4);
        tokio::spawn(async move { p.ingest.ingest_at(submission(&device, 39.0, now), now).await })
    });
    for joined in join_all(tasks).await {
        joined.unwrap().unwrap();
    }

    for i in 0..4 {
        let alerts = p.backend.list_alerts(&format!("device-{i}")).await.unwrap();
        assert_eq!(alerts.len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fever_in_memory() {
    concurrent_fever_readings_open_one_alert(&memory_pipeline()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolve_in_memory() {
    concurrent_normal_readings_resolve_once(&memory_pipeline()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_devices_do_not_interfere_in_memory() {
    devices_do_not_interfere(&memory_pipeline()).await;
}

#[cfg(feature = "storage-sqlite")]
mod sqlite {
    use super::*;
    use crate::helpers::sqlite_pipeline;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fever_sqlite() {
        let dir = tempdir().unwrap();
        concurrent_fever_readings_open_one_alert(&sqlite_pipeline(&dir).await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolve_sqlite() {
        let dir = tempdir().unwrap();
        concurrent_normal_readings_resolve_once(&sqlite_pipeline(&dir).await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_devices_do_not_interfere_sqlite() {
        let dir = tempdir().unwrap();
        devices_do_not_interfere(&sqlite_pipeline(&dir).await).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_retention_sweep_alongside_ingestion() {
    use fever_watch::actors::retention::RetentionHandle;
    use fever_watch::config::RetentionConfig;

    let p = memory_pipeline();
    let retention = RetentionHandle::spawn(
        p.backend.clone(),
        RetentionConfig {
            enabled: false,
            ..RetentionConfig::default()
        },
    );
    let now = now_millis();

    let ingest = {
        let p = p.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                let ts = now + Duration::milliseconds(i);
                p.ingest.ingest_at(submission("d1", 37.0, ts), ts).await.unwrap();
            }
        })
    };
    let sweeps = {
        let retention = retention.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                retention.sweep_now().await.unwrap();
            }
        })
    };

    ingest.await.unwrap();
    sweeps.await.unwrap();

    // nothing was old enough to be swept
    assert_eq!(p.backend.query_readings("d1", 100).await.unwrap().len(), 50);
    assert_eq!(retention.get_stats().await.unwrap().sweep_count, 10);

    retention.shutdown().await;
}
