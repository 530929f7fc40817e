//! Persistence port for schedule records.
//!
//! The scheduler only talks to storage through [`ScheduleStore`]. Writes are
//! conditional on the version the caller last read, so two reviews of the
//! same item cannot silently overwrite each other.

pub mod db;
pub mod fallback;
pub mod memory;

use crate::models::ScheduleRecord;
use rusqlite::ErrorCode;
use thiserror::Error;

pub use db::SqliteStore;
pub use fallback::FallbackStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("version conflict on item {item_id}: expected {expected:?}, found {found:?}")]
    Conflict {
        item_id: String,
        expected: Option<i64>,
        found: Option<i64>,
    },

    #[error("corrupt record for item {item_id}: {reason}")]
    Corrupt {
        item_id: String,
        version: i64,
        reason: String,
    },
}

impl StoreError {
    /// True for outages where another backend might still succeed. Bad data
    /// and constraint failures are not outages.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DiskFull
                    | ErrorCode::OutOfMemory
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A record together with the version it was stored under. Versions are
/// passed back to `put` exactly as read.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredSchedule {
    pub record: ScheduleRecord,
    pub version: i64,
}

pub trait ScheduleStore: Send + Sync {
    fn get(&self, learner_id: &str, item_id: &str) -> Result<Option<StoredSchedule>>;

    /// Writes `record`. `expected_version` is `None` when the caller saw no
    /// record, otherwise the version it read. Returns the new version.
    fn put(
        &self,
        learner_id: &str,
        record: &ScheduleRecord,
        expected_version: Option<i64>,
    ) -> Result<i64>;

    /// Every readable record for the learner, in no particular order.
    fn list(&self, learner_id: &str) -> Result<Vec<ScheduleRecord>>;

    /// Returns whether a record was removed.
    fn remove(&self, learner_id: &str, item_id: &str) -> Result<bool>;
}
