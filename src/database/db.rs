//! SQLite-backed schedule store
//!
//! One row per (learner, item). Dates are stored as `YYYY-MM-DD` text so no
//! timezone conversion ever touches them. Every successful write bumps the
//! row's `version`.

use super::{Result, ScheduleStore, StoreError, StoredSchedule};
use crate::models::ScheduleRecord;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Cells as read. Types are only checked in `decode`, so a cell of the wrong
/// type marks that one row as corrupt instead of failing the query.
struct RawRow {
    item_id: Value,
    next_review_date: Value,
    interval_days: Value,
    ease_factor: Value,
    repetitions: Value,
    last_review_date: Value,
    version: Value,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`. Lock waits longer than
    /// `busy_timeout` fail instead of blocking.
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::info!("opened schedule database at {}", path.as_ref().display());
        Self::from_connection(conn, busy_timeout)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, Duration::from_secs(5))
    }

    fn from_connection(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.busy_timeout(busy_timeout)?;
        init_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database connection lock poisoned".to_string()))
    }
}

/// Creates the schedules table if it is missing.
pub fn init_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedules (
            learner_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            next_review_date TEXT NOT NULL,
            interval_days INTEGER NOT NULL DEFAULT 1,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            repetitions INTEGER NOT NULL DEFAULT 0,
            last_review_date TEXT,
            version INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (learner_id, item_id)
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_schedules_due
            ON schedules (learner_id, next_review_date)",
        (),
    )?;

    Ok(())
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        item_id: row.get(0)?,
        next_review_date: row.get(1)?,
        interval_days: row.get(2)?,
        ease_factor: row.get(3)?,
        repetitions: row.get(4)?,
        last_review_date: row.get(5)?,
        version: row.get(6)?,
    })
}

/// Version reported for a row whose version cell is not an integer. A write
/// expecting it may overwrite that row.
const UNREADABLE_VERSION: i64 = 0;

fn stored_version(value: &Value) -> i64 {
    match value {
        Value::Integer(v) => *v,
        _ => UNREADABLE_VERSION,
    }
}

fn text(value: &Value, column: &str) -> std::result::Result<String, String> {
    match value {
        Value::Text(s) => Ok(s.clone()),
        other => Err(format!("{} is not text: {:?}", column, other)),
    }
}

fn integer(value: &Value, column: &str) -> std::result::Result<i64, String> {
    match value {
        Value::Integer(v) => Ok(*v),
        other => Err(format!("{} is not an integer: {:?}", column, other)),
    }
}

fn real(value: &Value, column: &str) -> std::result::Result<f64, String> {
    match value {
        Value::Real(v) => Ok(*v),
        Value::Integer(v) => Ok(*v as f64),
        other => Err(format!("{} is not a number: {:?}", column, other)),
    }
}

fn date(value: &Value, column: &str) -> std::result::Result<NaiveDate, String> {
    let text = text(value, column)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT)
        .map_err(|e| format!("{} {:?} is not a date: {}", column, text, e))
}

fn count(value: &Value, column: &str) -> std::result::Result<u32, String> {
    let raw = integer(value, column)?;
    u32::try_from(raw).map_err(|_| format!("{} {} out of range", column, raw))
}

/// Checks cell types and ranges. Any failure is reported as
/// `StoreError::Corrupt` carrying the version exactly as stored.
fn decode(raw: RawRow) -> Result<StoredSchedule> {
    let version = stored_version(&raw.version);
    let item_id = match &raw.item_id {
        Value::Text(s) => s.clone(),
        other => format!("{:?}", other),
    };

    let checked = || -> std::result::Result<ScheduleRecord, String> {
        integer(&raw.version, "version")?;
        Ok(ScheduleRecord {
            item_id: text(&raw.item_id, "item_id")?,
            next_review_date: date(&raw.next_review_date, "next_review_date")?,
            interval: count(&raw.interval_days, "interval_days")?,
            ease_factor: real(&raw.ease_factor, "ease_factor")?,
            repetitions: count(&raw.repetitions, "repetitions")?,
            last_review_date: match &raw.last_review_date {
                Value::Null => None,
                value => Some(date(value, "last_review_date")?),
            },
        })
    };

    match checked() {
        Ok(record) => Ok(StoredSchedule { record, version }),
        Err(reason) => Err(StoreError::Corrupt {
            item_id,
            version,
            reason,
        }),
    }
}

fn current_version(conn: &Connection, learner_id: &str, item_id: &str) -> Result<Option<i64>> {
    let version = conn
        .query_row(
            "SELECT version FROM schedules WHERE learner_id = ?1 AND item_id = ?2",
            params![learner_id, item_id],
            |row| row.get::<_, Value>(0),
        )
        .optional()?;
    Ok(version.as_ref().map(stored_version))
}

impl ScheduleStore for SqliteStore {
    fn get(&self, learner_id: &str, item_id: &str) -> Result<Option<StoredSchedule>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT item_id, next_review_date, interval_days, ease_factor, repetitions,
                        last_review_date, version
                 FROM schedules
                 WHERE learner_id = ?1 AND item_id = ?2",
                params![learner_id, item_id],
                read_row,
            )
            .optional()?;

        raw.map(decode).transpose()
    }

    fn put(
        &self,
        learner_id: &str,
        record: &ScheduleRecord,
        expected_version: Option<i64>,
    ) -> Result<i64> {
        let conn = self.lock()?;
        let next_review = record.next_review_date.format(DATE_FORMAT).to_string();
        let last_review = record
            .last_review_date
            .map(|d| d.format(DATE_FORMAT).to_string());

        let version = expected_version.map_or(1, |v| v.saturating_add(1));
        let changed = match expected_version {
            None => conn.execute(
                "INSERT INTO schedules (learner_id, item_id, next_review_date, interval_days,
                                        ease_factor, repetitions, last_review_date, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)
                 ON CONFLICT (learner_id, item_id) DO NOTHING",
                params![
                    learner_id,
                    record.item_id,
                    next_review,
                    record.interval,
                    record.ease_factor,
                    record.repetitions,
                    last_review
                ],
            )?,
            Some(expected) => conn.execute(
                "UPDATE schedules
                 SET next_review_date = ?1, interval_days = ?2, ease_factor = ?3,
                     repetitions = ?4, last_review_date = ?5, version = ?9
                 WHERE learner_id = ?6 AND item_id = ?7
                   AND (version = ?8 OR (?8 = 0 AND typeof(version) != 'integer'))",
                params![
                    next_review,
                    record.interval,
                    record.ease_factor,
                    record.repetitions,
                    last_review,
                    learner_id,
                    record.item_id,
                    expected,
                    version
                ],
            )?,
        };

        if changed == 0 {
            return Err(StoreError::Conflict {
                item_id: record.item_id.clone(),
                expected: expected_version,
                found: current_version(&conn, learner_id, &record.item_id)?,
            });
        }

        log::debug!(
            "stored schedule {}/{} at version {}",
            learner_id,
            record.item_id,
            version
        );
        Ok(version)
    }

    fn list(&self, learner_id: &str) -> Result<Vec<ScheduleRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT item_id, next_review_date, interval_days, ease_factor, repetitions,
                    last_review_date, version
             FROM schedules
             WHERE learner_id = ?1",
        )?;

        let rows = stmt
            .query_map(params![learner_id], read_row)?
            .collect::<rusqlite::Result<Vec<RawRow>>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for raw in rows {
            match decode(raw) {
                Ok(stored) => records.push(stored.record),
                Err(e) => log::warn!("skipping unreadable schedule for learner {}: {}", learner_id, e),
            }
        }
        Ok(records)
    }

    fn remove(&self, learner_id: &str, item_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM schedules WHERE learner_id = ?1 AND item_id = ?2",
            params![learner_id, item_id],
        )?;
        if removed > 0 {
            log::info!("removed schedule {}/{}", learner_id, item_id);
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(item_id: &str) -> ScheduleRecord {
        ScheduleRecord {
            item_id: item_id.to_string(),
            next_review_date: date(2024, 1, 8),
            interval: 6,
            ease_factor: 2.6,
            repetitions: 2,
            last_review_date: Some(date(2024, 1, 2)),
        }
    }

    #[test]
    fn test_put_then_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        let version = store.put("ola", &record("cześć"), None).unwrap();
        assert_eq!(version, 1);

        let stored = store.get("ola", "cześć").unwrap().unwrap();
        assert_eq!(stored.record, record("cześć"));
        assert_eq!(stored.version, 1);

        assert!(store.get("piotr", "cześć").unwrap().is_none());
    }

    #[test]
    fn test_versioned_update() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("ola", &record("cześć"), None).unwrap();

        let mut changed = record("cześć");
        changed.repetitions = 3;
        assert_eq!(store.put("ola", &changed, Some(1)).unwrap(), 2);
        assert_eq!(store.get("ola", "cześć").unwrap().unwrap().record.repetitions, 3);
    }

    #[test]
    fn test_stale_version_conflicts() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("ola", &record("cześć"), None).unwrap();
        store.put("ola", &record("cześć"), Some(1)).unwrap();

        match store.put("ola", &record("cześć"), Some(1)) {
            Err(StoreError::Conflict { expected, found, .. }) => {
                assert_eq!(expected, Some(1));
                assert_eq!(found, Some(2));
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        assert!(matches!(
            store.put("ola", &record("cześć"), None),
            Err(StoreError::Conflict { .. })
        ));
    }

    #[test]
    fn test_list_and_remove() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("ola", &record("a"), None).unwrap();
        store.put("ola", &record("b"), None).unwrap();
        store.put("piotr", &record("a"), None).unwrap();

        let mut ids: Vec<String> = store
            .list("ola")
            .unwrap()
            .into_iter()
            .map(|r| r.item_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        assert!(store.remove("ola", "a").unwrap());
        assert!(!store.remove("ola", "a").unwrap());
        assert_eq!(store.list("ola").unwrap().len(), 1);
        assert_eq!(store.list("piotr").unwrap().len(), 1);
    }

    #[test]
    fn test_undecodable_row_reports_corrupt() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("ola", &record("a"), None).unwrap();
        store.put("ola", &record("b"), None).unwrap();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE schedules SET interval_days = -4 WHERE item_id = 'a'",
                (),
            )
            .unwrap();
        }

        match store.get("ola", "a") {
            Err(StoreError::Corrupt { item_id, version, .. }) => {
                assert_eq!(item_id, "a");
                assert_eq!(version, 1);
            }
            other => panic!("expected corrupt record, got {:?}", other),
        }

        let listed = store.list("ola").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].item_id, "b");
    }

    fn corrupt_row(store: &SqliteStore, item_id: &str, assignments: &str) {
        let conn = store.lock().unwrap();
        conn.execute(
            &format!("UPDATE schedules SET {} WHERE item_id = ?1", assignments),
            params![item_id],
        )
        .unwrap();
    }

    #[test]
    fn test_wrong_cell_type_is_corrupt_not_sqlite_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("ola", &record("a"), None).unwrap();
        store.put("ola", &record("b"), None).unwrap();
        corrupt_row(&store, "a", "interval_days = 'abc'");

        match store.get("ola", "a") {
            Err(StoreError::Corrupt { item_id, version, reason }) => {
                assert_eq!(item_id, "a");
                assert_eq!(version, 1);
                assert!(reason.contains("interval_days"));
            }
            other => panic!("expected corrupt record, got {:?}", other),
        }

        let listed = store.list("ola").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].item_id, "b");
    }

    #[test]
    fn test_negative_version_is_kept_for_overwrite() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("ola", &record("a"), None).unwrap();
        corrupt_row(&store, "a", "version = -3, interval_days = -1");

        let version = match store.get("ola", "a") {
            Err(StoreError::Corrupt { version, .. }) => version,
            other => panic!("expected corrupt record, got {:?}", other),
        };
        assert_eq!(version, -3);

        assert_eq!(store.put("ola", &record("a"), Some(version)).unwrap(), -2);
        let stored = store.get("ola", "a").unwrap().unwrap();
        assert_eq!(stored.record, record("a"));
        assert_eq!(stored.version, -2);
    }

    #[test]
    fn test_unreadable_version_can_be_overwritten() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("ola", &record("a"), None).unwrap();
        corrupt_row(&store, "a", "version = 'x'");

        let version = match store.get("ola", "a") {
            Err(StoreError::Corrupt { version, .. }) => version,
            other => panic!("expected corrupt record, got {:?}", other),
        };
        assert_eq!(version, UNREADABLE_VERSION);

        assert!(matches!(
            store.put("ola", &record("a"), Some(5)),
            Err(StoreError::Conflict { found: Some(0), .. })
        ));
        assert_eq!(store.put("ola", &record("a"), Some(version)).unwrap(), 1);
        assert_eq!(store.get("ola", "a").unwrap().unwrap().version, 1);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.sqlite3");
        {
            let store = SqliteStore::open(&path, Duration::from_millis(500)).unwrap();
            store.put("ola", &record("cześć"), None).unwrap();
        }

        let reopened = SqliteStore::open(&path, Duration::from_millis(500)).unwrap();
        assert_eq!(
            reopened.get("ola", "cześć").unwrap().unwrap().record,
            record("cześć")
        );
    }
}
