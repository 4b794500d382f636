//! Error taxonomy for the fever alert core

use crate::storage::StorageError;

pub type FeverResult<T> = Result<T, FeverError>;

#[derive(Debug, thiserror::Error)]
pub enum FeverError {
    /// Malformed or missing fields in a submission; nothing was persisted
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation requires a record that does not exist
    #[error("{entity} not found for device {device_id}")]
    NotFound {
        entity: &'static str,
        device_id: String,
    },

    /// The storage collaborator failed. No retry happens here.
    #[error(transparent)]
    Persistence(#[from] StorageError),
}
