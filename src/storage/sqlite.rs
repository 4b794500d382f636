//! SQLite storage backend implementation
//!
//! ## Features
//!
//! - **Embedded**: no separate database server required
//! - **WAL mode**: readers are not blocked while ingestion writes
//! - **Connection pooling**: shared by request handlers and the retention actor
//! - **Migrations**: automatic schema versioning with sqlx
//!
//! ## Alert invariant
//!
//! A partial unique index on `fever_alerts (device_id) WHERE resolved = 0`
//! guarantees at most one unresolved alert per device. Opening an alert is an
//! `INSERT OR IGNORE ... RETURNING`, resolving one is an
//! `UPDATE ... WHERE resolved = 0 RETURNING`. Neither reads before writing.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::NewAlert;
use crate::{FeverAlert, Reading, TemperatureUnit, Threshold};

const ALERT_COLUMNS: &str =
    "id, device_id, temperature, threshold, timestamp, resolved, resolved_at";

/// SQLite storage backend
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables and indexes
    /// 3. Configure SQLite for concurrent readers (WAL mode)
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use fever_watch::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./fever.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        info!("SQLite connection pool created");

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// Helper to convert timestamp to Unix milliseconds for SQLite
    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    /// Helper to convert Unix milliseconds from SQLite to DateTime
    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn reading_from_row(row: &SqliteRow) -> Reading {
        Reading {
            device_id: row.get("device_id"),
            temperature: row.get("temperature"),
            timestamp: Self::millis_to_timestamp(row.get("timestamp")),
        }
    }

    fn threshold_from_row(row: &SqliteRow) -> Threshold {
        Threshold {
            device_id: row.get("device_id"),
            value: row.get("value"),
            unit: TemperatureUnit::Celsius,
            updated_at: Self::millis_to_timestamp(row.get("updated_at")),
        }
    }

    fn alert_from_row(row: &SqliteRow) -> FeverAlert {
        FeverAlert {
            id: row.get("id"),
            device_id: row.get("device_id"),
            temperature: row.get("temperature"),
            threshold: row.get("threshold"),
            timestamp: Self::millis_to_timestamp(row.get("timestamp")),
            resolved: row.get::<i64, _>("resolved") != 0,
            resolved_at: row
                .get::<Option<i64>, _>("resolved_at")
                .map(Self::millis_to_timestamp),
        }
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self, reading), fields(device_id = %reading.device_id))]
    async fn insert_reading(&self, reading: &Reading) -> StorageResult<()> {
        sqlx::query("INSERT INTO readings (device_id, temperature, timestamp) VALUES (?, ?, ?)")
            .bind(&reading.device_id)
            .bind(reading.temperature)
            .bind(Self::timestamp_to_millis(&reading.timestamp))
            .execute(&self.pool)
            .await?;

        debug!("reading inserted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn latest_reading(&self, device_id: &str) -> StorageResult<Option<Reading>> {
        let row = sqlx::query(
            r#"
            SELECT device_id, temperature, timestamp
            FROM readings
            WHERE device_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::reading_from_row))
    }

    #[instrument(skip(self))]
    async fn query_readings(&self, device_id: &str, limit: usize) -> StorageResult<Vec<Reading>> {
        debug!("querying latest {} readings for device {}", limit, device_id);

        let rows = sqlx::query(
            r#"
            SELECT device_id, temperature, timestamp
            FROM readings
            WHERE device_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(device_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let readings: Vec<Reading> = rows.iter().map(Self::reading_from_row).collect();
        debug!("query returned {} readings", readings.len());
        Ok(readings)
    }

    #[instrument(skip(self))]
    async fn find_threshold(&self, device_id: &str) -> StorageResult<Option<Threshold>> {
        let row =
            sqlx::query("SELECT device_id, value, updated_at FROM thresholds WHERE device_id = ?")
                .bind(device_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(Self::threshold_from_row))
    }

    #[instrument(skip(self))]
    async fn upsert_threshold(
        &self,
        device_id: &str,
        value: f64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<Threshold> {
        let row = sqlx::query(
            r#"
            INSERT INTO thresholds (device_id, value, unit, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (device_id) DO UPDATE SET
                value = excluded.value,
                unit = excluded.unit,
                updated_at = excluded.updated_at
            RETURNING device_id, value, updated_at
            "#,
        )
        .bind(device_id)
        .bind(value)
        .bind(TemperatureUnit::Celsius.as_str())
        .bind(Self::timestamp_to_millis(&updated_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::threshold_from_row(&row))
    }

    #[instrument(skip(self))]
    async fn update_threshold(
        &self,
        device_id: &str,
        value: f64,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<Option<Threshold>> {
        let row = sqlx::query(
            r#"
            UPDATE thresholds
            SET value = ?, updated_at = ?
            WHERE device_id = ?
            RETURNING device_id, value, updated_at
            "#,
        )
        .bind(value)
        .bind(Self::timestamp_to_millis(&updated_at))
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::threshold_from_row))
    }

    #[instrument(skip(self, alert), fields(device_id = %alert.device_id))]
    async fn open_alert(&self, alert: NewAlert) -> StorageResult<Option<FeverAlert>> {
        let alert = alert.into_alert();

        // the partial unique index turns a second unresolved alert into a no-op
        let sql = format!(
            r#"
            INSERT OR IGNORE INTO fever_alerts ({ALERT_COLUMNS})
            VALUES (?, ?, ?, ?, ?, 0, NULL)
            RETURNING {ALERT_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(&alert.id)
            .bind(&alert.device_id)
            .bind(alert.temperature)
            .bind(alert.threshold)
            .bind(Self::timestamp_to_millis(&alert.timestamp))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::alert_from_row))
    }

    #[instrument(skip(self))]
    async fn resolve_active_alert(
        &self,
        device_id: &str,
        resolved_at: DateTime<Utc>,
    ) -> StorageResult<Option<FeverAlert>> {
        let sql = format!(
            r#"
            UPDATE fever_alerts
            SET resolved = 1, resolved_at = MAX(?, timestamp)
            WHERE device_id = ? AND resolved = 0
            RETURNING {ALERT_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(Self::timestamp_to_millis(&resolved_at))
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::alert_from_row))
    }

    #[instrument(skip(self))]
    async fn active_alert(&self, device_id: &str) -> StorageResult<Option<FeverAlert>> {
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM fever_alerts WHERE device_id = ? AND resolved = 0"
        );

        let row = sqlx::query(&sql)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::alert_from_row))
    }

    #[instrument(skip(self))]
    async fn list_alerts(&self, device_id: &str) -> StorageResult<Vec<FeverAlert>> {
        let sql = format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM fever_alerts
            WHERE device_id = ?
            ORDER BY timestamp DESC
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(device_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::alert_from_row).collect())
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn delete_readings_before(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        info!("cleaning up readings older than {}", before);

        let result = sqlx::query("DELETE FROM readings WHERE timestamp < ?")
            .bind(Self::timestamp_to_millis(&before))
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() as usize;
        info!("deleted {} old readings", deleted);

        Ok(deleted)
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn delete_resolved_alerts_before(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        info!("cleaning up alerts resolved before {}", before);

        let result =
            sqlx::query("DELETE FROM fever_alerts WHERE resolved = 1 AND resolved_at < ?")
                .bind(Self::timestamp_to_millis(&before))
                .execute(&self.pool)
                .await?;

        let deleted = result.rows_affected() as usize;
        info!("deleted {} resolved alerts", deleted);

        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let (readings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM readings")
            .fetch_one(&self.pool)
            .await?;

        let (devices,): (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT device_id) FROM readings")
            .fetch_one(&self.pool)
            .await?;

        let (active, total): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(CASE WHEN resolved = 0 THEN 1 ELSE 0 END), 0), COUNT(*) FROM fever_alerts",
        )
        .fetch_one(&self.pool)
        .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        let file_size_mb = file_size as f64 / 1_000_000.0;

        Ok(format!(
            "SQLite: {} readings across {} devices, {} alerts ({} active), {:.2} MB on disk",
            readings, devices, total, active, file_size_mb
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
