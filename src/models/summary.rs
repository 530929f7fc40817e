//! Summary statistics over one learner's schedules.
use super::ScheduleRecord;
use super::due_set::{DEFAULT_HORIZON_DAYS, evaluate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub total_scheduled: usize,
    pub due_for_review: usize,
    pub upcoming_this_week: usize,
    /// Mean interval in whole days.
    pub average_interval: u32,
    /// Mean ease factor, two decimals.
    pub average_ease_factor: f64,
}

/// Computes the summary for `schedules` as seen on `today`. An empty slice
/// yields all zeros.
pub fn summarize(schedules: &[ScheduleRecord], today: NaiveDate) -> ScheduleSummary {
    if schedules.is_empty() {
        return ScheduleSummary::default();
    }

    let set = evaluate(schedules.iter().cloned(), today, DEFAULT_HORIZON_DAYS);
    let count = schedules.len() as f64;
    let interval_sum: f64 = schedules.iter().map(|s| f64::from(s.interval)).sum();
    let ease_sum: f64 = schedules.iter().map(|s| s.ease_factor).sum();

    ScheduleSummary {
        total_scheduled: schedules.len(),
        due_for_review: set.due.len(),
        upcoming_this_week: set.upcoming.len(),
        average_interval: (interval_sum / count).round() as u32,
        average_ease_factor: (ease_sum / count * 100.0).round() / 100.0,
    }
}
