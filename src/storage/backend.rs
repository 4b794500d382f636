//! Storage backend trait definition
//!
//! This module defines the `StorageBackend` trait that every persistence
//! gateway implementation must provide.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use super::schema::NewAlert;
use crate::{FeverAlert, Reading, Threshold};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Trait for persistent storage backends
///
/// The trait is designed to be:
///
/// - **Async**: all methods are async for compatibility with Tokio
/// - **Atomic per transition**: opening and resolving an alert are each a
///   single conditional write, never a read followed by a write
/// - **Maintainable**: age-filtered deletes for the retention sweep
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared across request
/// handlers and the retention actor.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>`. Implementations convert backend-specific
/// errors to `StorageError` variants.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Append a reading. Readings are never updated.
    async fn insert_reading(&self, reading: &Reading) -> StorageResult<()>;

    /// Most recent reading for a device by timestamp
    async fn latest_reading(&self, device_id: &str) -> StorageResult<Option<Reading>>;

    /// Readings for a device, newest first, capped at `limit`
    async fn query_readings(&self, device_id: &str, limit: usize) -> StorageResult<Vec<Reading>>;

    /// Stored threshold for a device, if any
    async fn find_threshold(&self, device_id: &str) -> StorageResult<Option<Threshold>>;

    /// Insert or overwrite the threshold for a device
    async fn upsert_threshold(
        &self,
        device_id: &str,
        value: f64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<Threshold>;

    /// Overwrite the threshold only if the device already has one
    ///
    /// Returns `None` when there is nothing to update.
    async fn update_threshold(
        &self,
        device_id: &str,
        value: f64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<Option<Threshold>>;

    /// Create an alert unless the device already has an unresolved one
    ///
    /// The existence check and the insert must be a single atomic step:
    /// two concurrent calls for the same device yield at most one `Some`.
    async fn open_alert(&self, alert: NewAlert) -> StorageResult<Option<FeverAlert>>;

    /// Resolve the device's unresolved alert, if there is one
    ///
    /// `resolved_at` is clamped so that it is never earlier than the alert's
    /// creation timestamp.
    async fn resolve_active_alert(
        &self,
        device_id: &str,
        resolved_at: DateTime<Utc>,
    ) -> StorageResult<Option<FeverAlert>>;

    /// The device's unresolved alert, if any
    async fn active_alert(&self, device_id: &str) -> StorageResult<Option<FeverAlert>>;

    /// All alerts for a device, newest first
    async fn list_alerts(&self, device_id: &str) -> StorageResult<Vec<FeverAlert>>;

    /// Delete readings with a timestamp strictly before `before`
    ///
    /// Returns the number of readings deleted.
    async fn delete_readings_before(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    /// Delete resolved alerts whose `resolved_at` is strictly before `before`
    ///
    /// Unresolved alerts are never touched. Returns the number deleted.
    async fn delete_resolved_alerts_before(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend is operational.
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Human-readable stats about the backend
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
