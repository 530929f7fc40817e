//! Short-lived cache for learner summaries.
//!
//! Entries are keyed by learner and calendar day, since the due counts change
//! when the day does. The caller passes `now` on every lookup.
use super::ScheduleSummary;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;

#[derive(Clone, Debug)]
struct CachedSummary {
    summary: ScheduleSummary,
    stored_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct StatsCache {
    ttl: Duration,
    entries: HashMap<(String, NaiveDate), CachedSummary>,
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached summary if it was stored less than `ttl` before `now`.
    pub fn get(&self, learner_id: &str, today: NaiveDate, now: DateTime<Utc>) -> Option<ScheduleSummary> {
        self.entries
            .get(&(learner_id.to_string(), today))
            .filter(|entry| now.signed_duration_since(entry.stored_at) < self.ttl)
            .map(|entry| entry.summary.clone())
    }

    pub fn insert(
        &mut self,
        learner_id: &str,
        today: NaiveDate,
        summary: ScheduleSummary,
        now: DateTime<Utc>,
    ) {
        self.entries.insert(
            (learner_id.to_string(), today),
            CachedSummary {
                summary,
                stored_at: now,
            },
        );
    }

    /// Cached value on a hit, otherwise runs `compute` and stores its result.
    /// Errors from `compute` are returned and nothing is cached.
    pub fn get_or_try_insert_with<E, F>(
        &mut self,
        learner_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
        compute: F,
    ) -> Result<ScheduleSummary, E>
    where
        F: FnOnce() -> Result<ScheduleSummary, E>,
    {
        if let Some(hit) = self.get(learner_id, today, now) {
            log::debug!("stats cache hit for learner {}", learner_id);
            return Ok(hit);
        }
        let summary = compute()?;
        self.insert(learner_id, today, summary.clone(), now);
        Ok(summary)
    }

    /// Drops every entry for `learner_id`. Call after recording a review.
    pub fn invalidate(&mut self, learner_id: &str) {
        self.entries.retain(|(learner, _), _| learner != learner_id);
    }

    /// Removes expired entries.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.signed_duration_since(entry.stored_at) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
