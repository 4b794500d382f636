//! In-memory storage backend (no persistence)
//!
//! Useful for:
//! - Testing without database dependencies
//! - Running the hub with `backend = "none"`
//!
//! Every alert transition runs under a single write lock, which makes the
//! check for an unresolved alert and the write that follows one atomic step.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, StorageBackend};
use super::error::StorageResult;
use super::schema::NewAlert;
use crate::{FeverAlert, Reading, TemperatureUnit, Threshold};

#[derive(Debug, Default)]
struct MemoryState {
    /// Readings grouped by device, in insertion order
    readings: HashMap<String, Vec<Reading>>,

    thresholds: HashMap<String, Threshold>,

    alerts: Vec<FeverAlert>,
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(readings: &mut [Reading]) {
    // stable sort keeps later inserts ahead on equal timestamps after reverse
    readings.reverse();
    readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert_reading(&self, reading: &Reading) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state
            .readings
            .entry(reading.device_id.clone())
            .or_default()
            .push(reading.clone());
        Ok(())
    }

    async fn latest_reading(&self, device_id: &str) -> StorageResult<Option<Reading>> {
        Ok(self.query_readings(device_id, 1).await?.into_iter().next())
    }

    async fn query_readings(&self, device_id: &str, limit: usize) -> StorageResult<Vec<Reading>> {
        debug!("querying latest {} readings for {}", limit, device_id);

        let state = self.state.read().await;
        let mut readings = state.readings.get(device_id).cloned().unwrap_or_default();
        newest_first(&mut readings);
        readings.truncate(limit);

        Ok(readings)
    }

    async fn find_threshold(&self, device_id: &str) -> StorageResult<Option<Threshold>> {
        Ok(self.state.read().await.thresholds.get(device_id).cloned())
    }

    async fn upsert_threshold(
        &self,
        device_id: &str,
        value: f64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<Threshold> {
        let threshold = Threshold {
            device_id: device_id.to_string(),
            value,
            unit: TemperatureUnit::Celsius,
            updated_at,
        };

        self.state
            .write()
            .await
            .thresholds
            .insert(device_id.to_string(), threshold.clone());

        Ok(threshold)
    }

    async fn update_threshold(
        &self,
        device_id: &str,
        value: f64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<Option<Threshold>> {
        let mut state = self.state.write().await;
        let Some(threshold) = state.thresholds.get_mut(device_id) else {
            return Ok(None);
        };

        threshold.value = value;
        threshold.updated_at = updated_at;

        Ok(Some(threshold.clone()))
    }

    async fn open_alert(&self, alert: NewAlert) -> StorageResult<Option<FeverAlert>> {
        let mut state = self.state.write().await;

        let already_active = state
            .alerts
            .iter()
            .any(|a| a.device_id == alert.device_id && a.is_active());
        if already_active {
            return Ok(None);
        }

        let alert = alert.into_alert();
        state.alerts.push(alert.clone());

        Ok(Some(alert))
    }

    async fn resolve_active_alert(
        &self,
        device_id: &str,
        resolved_at: DateTime<Utc>,
    ) -> StorageResult<Option<FeverAlert>> {
        let mut state = self.state.write().await;

        let Some(alert) = state
            .alerts
            .iter_mut()
            .find(|a| a.device_id == device_id && a.is_active())
        else {
            return Ok(None);
        };

        alert.resolved = true;
        alert.resolved_at = Some(resolved_at.max(alert.timestamp));

        Ok(Some(alert.clone()))
    }

    async fn active_alert(&self, device_id: &str) -> StorageResult<Option<FeverAlert>> {
        let state = self.state.read().await;
        Ok(state
            .alerts
            .iter()
            .find(|a| a.device_id == device_id && a.is_active())
            .cloned())
    }

    async fn list_alerts(&self, device_id: &str) -> StorageResult<Vec<FeverAlert>> {
        let state = self.state.read().await;
        let mut alerts: Vec<FeverAlert> = state
            .alerts
            .iter()
            .filter(|a| a.device_id == device_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(alerts)
    }

    async fn delete_readings_before(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut state = self.state.write().await;
        let mut deleted = 0;

        for readings in state.readings.values_mut() {
            let len = readings.len();
            readings.retain(|r| r.timestamp >= before);
            deleted += len - readings.len();
        }
        state.readings.retain(|_, readings| !readings.is_empty());

        debug!("deleted {} readings before {}", deleted, before);
        Ok(deleted)
    }

    async fn delete_resolved_alerts_before(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut state = self.state.write().await;
        let len = state.alerts.len();

        state
            .alerts
            .retain(|a| !matches!(a.resolved_at, Some(resolved_at) if resolved_at < before));

        let deleted = len - state.alerts.len();
        debug!("deleted {} resolved alerts before {}", deleted, before);
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([("backend".to_string(), "memory".to_string())]),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let state = self.state.read().await;
        let readings: usize = state.readings.values().map(Vec::len).sum();

        Ok(format!(
            "In-Memory: {} readings across {} devices, {} thresholds, {} alerts",
            readings,
            state.readings.len(),
            state.thresholds.len(),
            state.alerts.len()
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
