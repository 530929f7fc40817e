pub mod due_set;
pub mod quality;
pub mod schedule_record;
pub mod sm2;
pub mod stats_cache;
pub mod summary;

pub use due_set::DueSet;
pub use quality::{Quality, QualityError};
pub use schedule_record::ScheduleRecord;
pub use stats_cache::StatsCache;
pub use summary::ScheduleSummary;
