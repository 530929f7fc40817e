//! Errors surfaced by the scheduler to its callers.
use crate::database::StoreError;
use crate::models::QualityError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("invalid quality rating: {0}")]
    Validation(#[from] QualityError),

    #[error("review not recorded, storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("item {item_id} was updated concurrently; gave up after {attempts} attempts")]
    ConflictRetriesExhausted { item_id: String, attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
