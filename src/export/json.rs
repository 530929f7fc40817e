//! JSON import/export of a learner's schedules.
//! Export writes every readable schedule to a file; import writes a file's
//! schedules back through the store, replacing existing ones.

use crate::database::{ScheduleStore, StoreError};
use crate::error::Result;
use crate::models::ScheduleRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleExport {
    pub learner_id: String,
    pub schedules: Vec<ScheduleRecord>,
}

/// Exports the learner's schedules, sorted by item id, to a JSON file.
/// Returns how many schedules were written.
pub fn export_json_to_path<S: ScheduleStore>(
    store: &S,
    learner_id: &str,
    path: &Path,
) -> Result<usize> {
    let mut schedules = store.list(learner_id)?;
    schedules.sort_by(|a, b| a.item_id.cmp(&b.item_id));

    let export = ScheduleExport {
        learner_id: learner_id.to_string(),
        schedules,
    };
    let json_string = serde_json::to_string_pretty(&export)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;

    log::info!(
        "exported {} schedules for {} to {}",
        export.schedules.len(),
        learner_id,
        path.display()
    );
    Ok(export.schedules.len())
}

/// Reads an export file.
pub fn import_json(path: &Path) -> Result<ScheduleExport> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let export: ScheduleExport = serde_json::from_str(&contents)?;
    Ok(export)
}

/// Stores every valid schedule from `export` under `learner_id`, overwriting
/// what is there. Invalid schedules are skipped. Returns how many were stored.
pub fn import_into<S: ScheduleStore>(
    store: &S,
    learner_id: &str,
    export: &ScheduleExport,
) -> Result<usize> {
    let mut imported = 0;
    for record in &export.schedules {
        if let Err(reason) = record.validate() {
            log::warn!("not importing schedule {}: {}", record.item_id, reason);
            continue;
        }

        let version = match store.get(learner_id, &record.item_id) {
            Ok(stored) => stored.map(|s| s.version),
            Err(StoreError::Corrupt { version, .. }) => Some(version),
            Err(e) => return Err(e.into()),
        };
        store.put(learner_id, record, version)?;
        imported += 1;
    }

    log::info!(
        "imported {} of {} schedules for {}",
        imported,
        export.schedules.len(),
        learner_id
    );
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use chrono::NaiveDate;
    use std::fs;

    fn record(item_id: &str, interval: u32) -> ScheduleRecord {
        let last = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ScheduleRecord {
            item_id: item_id.to_string(),
            next_review_date: last + chrono::Days::new(u64::from(interval)),
            interval,
            ease_factor: 2.5,
            repetitions: 1,
            last_review_date: Some(last),
        }
    }

    #[test]
    fn test_export_and_import_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.json");

        let source = MemoryStore::new();
        source.put("ola", &record("proszę", 6), None).unwrap();
        source.put("ola", &record("cześć", 1), None).unwrap();

        assert_eq!(export_json_to_path(&source, "ola", &path).unwrap(), 2);

        let export = import_json(&path).unwrap();
        assert_eq!(export.learner_id, "ola");
        let ids: Vec<&str> = export.schedules.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["cześć", "proszę"]);

        let target = MemoryStore::new();
        assert_eq!(import_into(&target, "piotr", &export).unwrap(), 2);
        assert_eq!(
            target.get("piotr", "proszę").unwrap().unwrap().record,
            record("proszę", 6)
        );
    }

    #[test]
    fn test_import_overwrites_and_skips_invalid() {
        let store = MemoryStore::new();
        store.put("ola", &record("cześć", 1), None).unwrap();

        let mut broken = record("zły", 1);
        broken.ease_factor = 0.2;
        let export = ScheduleExport {
            learner_id: "ola".to_string(),
            schedules: vec![record("cześć", 6), broken],
        };

        assert_eq!(import_into(&store, "ola", &export).unwrap(), 1);
        let stored = store.get("ola", "cześć").unwrap().unwrap();
        assert_eq!(stored.record.interval, 6);
        assert_eq!(stored.version, 2);
        assert!(store.get("ola", "zły").unwrap().is_none());
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_json(Path::new("nonexistent_file_xyz123.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_import_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        assert!(import_json(&path).is_err());
    }
}
