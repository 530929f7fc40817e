//! Scheduler settings, optionally read from a TOML file.
use crate::error::Result;
use chrono::Duration as TimeDelta;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Days ahead that count as "upcoming".
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
    #[serde(default = "default_stats_cache_ttl_secs")]
    pub stats_cache_ttl_secs: i64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("schedules.sqlite3")
}

fn default_horizon_days() -> u32 {
    7
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_stats_cache_ttl_secs() -> i64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            horizon_days: default_horizon_days(),
            busy_timeout_ms: default_busy_timeout_ms(),
            max_conflict_retries: default_max_conflict_retries(),
            stats_cache_ttl_secs: default_stats_cache_ttl_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Reads `path` if given, otherwise uses the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn stats_cache_ttl(&self) -> TimeDelta {
        TimeDelta::seconds(self.stats_cache_ttl_secs)
    }
}
