//! Review scheduling on top of a [`ScheduleStore`].
//!
//! Recording a review reads the stored schedule, runs SM-2 and writes the
//! result back conditionally on the version it read. A concurrent write to
//! the same item makes the write fail, and the whole read-compute-write is
//! retried a bounded number of times.

use crate::config::SchedulerConfig;
use crate::database::{ScheduleStore, StoreError};
use crate::error::{Result, SchedulerError};
use crate::models::due_set::{self, DEFAULT_HORIZON_DAYS};
use crate::models::{DueSet, Quality, ScheduleRecord, ScheduleSummary, StatsCache, sm2, summary};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;
const DEFAULT_STATS_CACHE_TTL_SECS: i64 = 60;

pub struct Scheduler<S> {
    store: S,
    horizon_days: u32,
    max_conflict_retries: u32,
    stats_cache: Mutex<StatsCache>,
}

/// Prior state of an item as far as the next review is concerned.
struct Prior {
    record: Option<ScheduleRecord>,
    version: Option<i64>,
}

impl<S: ScheduleStore> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            horizon_days: DEFAULT_HORIZON_DAYS,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            stats_cache: Mutex::new(StatsCache::new(chrono::Duration::seconds(
                DEFAULT_STATS_CACHE_TTL_SECS,
            ))),
        }
    }

    pub fn with_config(store: S, config: &SchedulerConfig) -> Self {
        Self {
            store,
            horizon_days: config.horizon_days,
            max_conflict_retries: config.max_conflict_retries,
            stats_cache: Mutex::new(StatsCache::new(config.stats_cache_ttl())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Parses `raw_quality` and records the review. Non-numeric ratings are
    /// rejected before storage is touched.
    pub fn record_raw_review(
        &self,
        learner_id: &str,
        item_id: &str,
        raw_quality: &str,
        today: NaiveDate,
    ) -> Result<ScheduleRecord> {
        let quality: Quality = raw_quality.parse()?;
        self.record_review(learner_id, item_id, quality, today)
    }

    /// Applies a review rated `quality` on `today` and returns the stored
    /// schedule.
    pub fn record_review(
        &self,
        learner_id: &str,
        item_id: &str,
        quality: Quality,
        today: NaiveDate,
    ) -> Result<ScheduleRecord> {
        let attempts = self.max_conflict_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let prior = self.load_prior(learner_id, item_id)?;
            let next = sm2::update(prior.record.as_ref(), item_id, quality, today);

            match self.store.put(learner_id, &next, prior.version) {
                Ok(version) => {
                    log::info!(
                        "recorded review {}/{} quality {}: next review {} (interval {}, version {})",
                        learner_id,
                        item_id,
                        quality,
                        next.next_review_date,
                        next.interval,
                        version
                    );
                    self.cache().invalidate(learner_id);
                    return Ok(next);
                }
                Err(StoreError::Conflict { expected, found, .. }) => {
                    log::debug!(
                        "write conflict on {}/{} (attempt {}, expected {:?}, found {:?})",
                        learner_id,
                        item_id,
                        attempt,
                        expected,
                        found
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SchedulerError::ConflictRetriesExhausted {
            item_id: item_id.to_string(),
            attempts,
        })
    }

    /// Due and upcoming items for `today`, with `due` ordered oldest first.
    pub fn due_items(&self, learner_id: &str, today: NaiveDate) -> Result<DueSet> {
        let schedules = self.load_valid(learner_id)?;
        let mut set = due_set::evaluate(schedules, today, self.horizon_days);
        set.sort_due_oldest_first();
        Ok(set)
    }

    pub fn stats(&self, learner_id: &str, today: NaiveDate) -> Result<ScheduleSummary> {
        let schedules = self.load_valid(learner_id)?;
        Ok(summary::summarize(&schedules, today))
    }

    /// Like [`Scheduler::stats`], served from `cache` while the entry is fresh.
    pub fn stats_cached(
        &self,
        cache: &mut StatsCache,
        learner_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ScheduleSummary> {
        cache.get_or_try_insert_with(learner_id, today, now, || self.stats(learner_id, today))
    }

    /// Summary served from the scheduler's own cache. Entries live for the
    /// configured TTL and are dropped whenever the learner's schedules change.
    pub fn cached_stats(
        &self,
        learner_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ScheduleSummary> {
        self.cache()
            .get_or_try_insert_with(learner_id, today, now, || self.stats(learner_id, today))
    }

    /// Interval each rating would give the item if reviewed on `today`.
    pub fn preview(
        &self,
        learner_id: &str,
        item_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<(Quality, u32)>> {
        let prior = self.load_prior(learner_id, item_id)?;
        Ok(sm2::preview_intervals(prior.record.as_ref(), today))
    }

    /// Administrative removal; never called while recording reviews.
    pub fn remove_item(&self, learner_id: &str, item_id: &str) -> Result<bool> {
        let removed = self.store.remove(learner_id, item_id)?;
        if removed {
            self.cache().invalidate(learner_id);
        }
        Ok(removed)
    }

    fn cache(&self) -> MutexGuard<'_, StatsCache> {
        // Cached summaries stay valid after a panic elsewhere
        self.stats_cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the stored schedule. A record that breaks an invariant is logged
    /// and treated as never reviewed; its version is kept so the next write
    /// replaces it.
    fn load_prior(&self, learner_id: &str, item_id: &str) -> Result<Prior> {
        match self.store.get(learner_id, item_id) {
            Ok(Some(stored)) => match stored.record.validate() {
                Ok(()) => Ok(Prior {
                    record: Some(stored.record),
                    version: Some(stored.version),
                }),
                Err(reason) => {
                    log::warn!(
                        "corrupt schedule {}/{} treated as new: {}",
                        learner_id,
                        item_id,
                        reason
                    );
                    Ok(Prior {
                        record: None,
                        version: Some(stored.version),
                    })
                }
            },
            Ok(None) => Ok(Prior {
                record: None,
                version: None,
            }),
            Err(StoreError::Corrupt {
                version, reason, ..
            }) => {
                log::warn!(
                    "unreadable schedule {}/{} treated as new: {}",
                    learner_id,
                    item_id,
                    reason
                );
                Ok(Prior {
                    record: None,
                    version: Some(version),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn load_valid(&self, learner_id: &str) -> Result<Vec<ScheduleRecord>> {
        let schedules = self.store.list(learner_id)?;
        Ok(schedules
            .into_iter()
            .filter(|record| match record.validate() {
                Ok(()) => true,
                Err(reason) => {
                    log::warn!(
                        "skipping corrupt schedule {}/{}: {}",
                        learner_id,
                        record.item_id,
                        reason
                    );
                    false
                }
            })
            .collect())
    }
}
