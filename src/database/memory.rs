//! In-process schedule store, used in tests and as a local fallback.
use super::{Result, ScheduleStore, StoreError, StoredSchedule};
use crate::models::ScheduleRecord;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

type Key = (String, String);

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<Key, StoredSchedule>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Key, StoredSchedule>>> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl ScheduleStore for MemoryStore {
    fn get(&self, learner_id: &str, item_id: &str) -> Result<Option<StoredSchedule>> {
        let rows = self.lock()?;
        Ok(rows
            .get(&(learner_id.to_string(), item_id.to_string()))
            .cloned())
    }

    fn put(
        &self,
        learner_id: &str,
        record: &ScheduleRecord,
        expected_version: Option<i64>,
    ) -> Result<i64> {
        let mut rows = self.lock()?;
        let key = (learner_id.to_string(), record.item_id.clone());
        let found = rows.get(&key).map(|stored| stored.version);
        if found != expected_version {
            return Err(StoreError::Conflict {
                item_id: record.item_id.clone(),
                expected: expected_version,
                found,
            });
        }

        let version = found.map_or(1, |v| v.saturating_add(1));
        rows.insert(
            key,
            StoredSchedule {
                record: record.clone(),
                version,
            },
        );
        Ok(version)
    }

    fn list(&self, learner_id: &str) -> Result<Vec<ScheduleRecord>> {
        let rows = self.lock()?;
        Ok(rows
            .iter()
            .filter(|((learner, _), _)| learner == learner_id)
            .map(|(_, stored)| stored.record.clone())
            .collect())
    }

    fn remove(&self, learner_id: &str, item_id: &str) -> Result<bool> {
        let mut rows = self.lock()?;
        Ok(rows
            .remove(&(learner_id.to_string(), item_id.to_string()))
            .is_some())
    }
}
