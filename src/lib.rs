pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use database::{FallbackStore, MemoryStore, ScheduleStore, SqliteStore, StoreError};
pub use error::SchedulerError;
pub use models::{DueSet, Quality, QualityError, ScheduleRecord, ScheduleSummary, StatsCache};
pub use scheduler::Scheduler;
