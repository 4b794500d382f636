//! Persistence gateway for readings, thresholds and fever alerts
//!
//! The core never talks to a database directly. Everything goes through the
//! `StorageBackend` trait, injected as an `Arc<dyn StorageBackend>`, so the
//! alert state machine and the status evaluator can run against the in-memory
//! backend in tests and against SQLite in production.
//!
//! ## Backends
//!
//! - **SQLite** (default): embedded database, one file per hub
//! - **In-Memory**: no persistence, for tests or `backend = "none"`
//!
//! ## Usage
//!
//! ```no_run
//! use fever_watch::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./fever.db").await?;
//!     let latest = backend.latest_reading("d1").await?;
//!     println!("{latest:?}");
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

use std::sync::Arc;

use tracing::info;

pub use backend::{HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use schema::NewAlert;

use crate::config::StorageConfig;

/// Open the backend selected by the configuration
pub async fn open_backend(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::None => {
            info!("using in-memory storage, nothing will be persisted");
            Ok(Arc::new(memory::MemoryBackend::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => Ok(Arc::new(sqlite::SqliteBackend::new(path).await?)),
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => Err(StorageError::InvalidConfig(
            "sqlite backend requested but the storage-sqlite feature is disabled".to_string(),
        )),
    }
}
