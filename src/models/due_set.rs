//! Splits a learner's schedules into what is due today, what comes up soon and
//! the rest.
use super::ScheduleRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HORIZON_DAYS: u32 = 7;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSet {
    pub due: Vec<ScheduleRecord>,
    pub upcoming: Vec<ScheduleRecord>,
    pub neither: Vec<ScheduleRecord>,
}

impl DueSet {
    /// Orders `due` so the longest-overdue item comes first. Ties keep their
    /// input order.
    pub fn sort_due_oldest_first(&mut self) {
        self.due.sort_by_key(|record| record.next_review_date);
    }
}

/// Partitions `schedules` relative to `today`. Each partition keeps the input
/// order.
pub fn evaluate<I>(schedules: I, today: NaiveDate, horizon_days: u32) -> DueSet
where
    I: IntoIterator<Item = ScheduleRecord>,
{
    let mut set = DueSet::default();
    for record in schedules {
        if record.is_due(today) {
            set.due.push(record);
        } else if record.days_until_due(today) <= i64::from(horizon_days) {
            set.upcoming.push(record);
        } else {
            set.neither.push(record);
        }
    }
    set
}
