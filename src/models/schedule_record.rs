//! Per-(learner, item) review schedule.
//!
//! One record exists for every item a learner has reviewed at least once. It is
//! created by the first review and rewritten by every review after that.
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Ease factor assigned to an item on its first review.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Ease factor never drops below this value.
pub const MIN_EASE_FACTOR: f64 = 1.3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub item_id: String,
    pub next_review_date: NaiveDate,
    /// Days between `last_review_date` and `next_review_date`.
    pub interval: u32,
    pub ease_factor: f64,
    /// Consecutive successful reviews since the last failure.
    pub repetitions: u32,
    #[serde(default)]
    pub last_review_date: Option<NaiveDate>,
}

impl ScheduleRecord {
    /// True when the item has to be reviewed on `today` (or is overdue).
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review_date <= today
    }

    /// Signed number of days from `today` until the item becomes due.
    /// Negative for overdue items.
    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.next_review_date - today).num_days()
    }

    /// Checks the stored invariants, returning a description of the first one
    /// that does not hold.
    pub fn validate(&self) -> Result<(), String> {
        if self.item_id.is_empty() {
            return Err("empty item id".to_string());
        }
        if self.interval < 1 {
            return Err(format!("interval {} is below 1", self.interval));
        }
        if !self.ease_factor.is_finite() || self.ease_factor < MIN_EASE_FACTOR {
            return Err(format!(
                "ease factor {} is below {}",
                self.ease_factor, MIN_EASE_FACTOR
            ));
        }
        if let Some(last) = self.last_review_date {
            let expected = last.checked_add_days(Days::new(u64::from(self.interval)));
            if expected != Some(self.next_review_date) {
                return Err(format!(
                    "next review {} does not match last review {} + {} days",
                    self.next_review_date, last, self.interval
                ));
            }
        }
        Ok(())
    }
}
