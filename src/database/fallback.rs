//! Primary store with a local fallback.
//!
//! Each call goes to the primary first. Only an unavailable primary sends the
//! call to the fallback; conflicts and corrupt records are returned as-is.
use super::{Result, ScheduleStore, StoredSchedule};
use crate::models::ScheduleRecord;

pub struct FallbackStore<P, F> {
    primary: P,
    fallback: F,
}

impl<P: ScheduleStore, F: ScheduleStore> FallbackStore<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    fn with_fallback<T>(
        &self,
        op: &str,
        primary: impl FnOnce(&P) -> Result<T>,
        fallback: impl FnOnce(&F) -> Result<T>,
    ) -> Result<T> {
        match primary(&self.primary) {
            Err(e) if e.is_unavailable() => {
                log::warn!("primary store failed on {}, using fallback: {}", op, e);
                fallback(&self.fallback)
            }
            other => other,
        }
    }
}

impl<P: ScheduleStore, F: ScheduleStore> ScheduleStore for FallbackStore<P, F> {
    fn get(&self, learner_id: &str, item_id: &str) -> Result<Option<StoredSchedule>> {
        self.with_fallback(
            "get",
            |s| s.get(learner_id, item_id),
            |s| s.get(learner_id, item_id),
        )
    }

    fn put(
        &self,
        learner_id: &str,
        record: &ScheduleRecord,
        expected_version: Option<i64>,
    ) -> Result<i64> {
        self.with_fallback(
            "put",
            |s| s.put(learner_id, record, expected_version),
            |s| s.put(learner_id, record, expected_version),
        )
    }

    fn list(&self, learner_id: &str) -> Result<Vec<ScheduleRecord>> {
        self.with_fallback("list", |s| s.list(learner_id), |s| s.list(learner_id))
    }

    fn remove(&self, learner_id: &str, item_id: &str) -> Result<bool> {
        self.with_fallback(
            "remove",
            |s| s.remove(learner_id, item_id),
            |s| s.remove(learner_id, item_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, SqliteStore, StoreError};
    use chrono::NaiveDate;

    struct OfflineStore;

    impl ScheduleStore for OfflineStore {
        fn get(&self, _: &str, _: &str) -> Result<Option<StoredSchedule>> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
        fn put(&self, _: &str, _: &ScheduleRecord, _: Option<i64>) -> Result<i64> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
        fn list(&self, _: &str) -> Result<Vec<ScheduleRecord>> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
        fn remove(&self, _: &str, _: &str) -> Result<bool> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    fn record(item_id: &str) -> ScheduleRecord {
        ScheduleRecord {
            item_id: item_id.to_string(),
            next_review_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            interval: 1,
            ease_factor: 2.5,
            repetitions: 1,
            last_review_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        }
    }

    #[test]
    fn test_healthy_primary_is_used() {
        let store = FallbackStore::new(MemoryStore::new(), MemoryStore::new());
        store.put("ola", &record("a"), None).unwrap();

        assert_eq!(store.primary().list("ola").unwrap().len(), 1);
        assert!(store.fallback().list("ola").unwrap().is_empty());
    }

    #[test]
    fn test_offline_primary_falls_back() {
        let store = FallbackStore::new(OfflineStore, MemoryStore::new());
        store.put("ola", &record("a"), None).unwrap();

        assert_eq!(store.get("ola", "a").unwrap().unwrap().record, record("a"));
        assert_eq!(store.list("ola").unwrap().len(), 1);
        assert!(store.remove("ola", "a").unwrap());
    }

    #[test]
    fn test_conflicts_do_not_fall_back() {
        let store = FallbackStore::new(MemoryStore::new(), MemoryStore::new());
        store.put("ola", &record("a"), None).unwrap();

        let err = store.put("ola", &record("a"), None).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert!(store.fallback().get("ola", "a").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_primary_row_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.sqlite3");
        let primary = SqliteStore::open(&path, std::time::Duration::from_secs(1)).unwrap();
        primary.put("ola", &record("a"), None).unwrap();
        primary.put("ola", &record("b"), None).unwrap();
        let fallback = MemoryStore::new();
        fallback.put("ola", &record("stale"), None).unwrap();
        let store = FallbackStore::new(primary, fallback);

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute("UPDATE schedules SET ease_factor = 'high' WHERE item_id = 'a'", ())
            .unwrap();

        let listed = store.list("ola").unwrap();
        assert_eq!(listed, vec![record("b")]);
        assert!(matches!(
            store.get("ola", "a"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_both_offline_surfaces_error() {
        let store = FallbackStore::new(OfflineStore, OfflineStore);
        let err = store.list("ola").unwrap_err();
        assert!(err.is_unavailable());
    }
}
