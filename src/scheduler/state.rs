//! Persisted scheduler state
//!
//! A flat, unversioned key/value namespace. Values are written one at a time
//! as a task progresses, so a crash mid-run leaves a readable trail.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use super::task::{TaskKind, TaskPhase};
use crate::error::{TrackbookError, TrackbookResult};
use crate::storage::{read_json, write_json_atomic};

const AUTO_BACKUP_ENABLED: &str = "auto_backup.enabled";
const LAST_BACKUP_SUCCESS: &str = "auto_backup.last_success";
const LAST_BACKUP_ATTEMPT: &str = "auto_backup.last_attempt";
const LAST_CLEANUP_DATE: &str = "log_cleanup.last_run_date";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Get/set by key
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> TrackbookResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> TrackbookResult<()>;
    fn remove(&self, key: &str) -> TrackbookResult<()>;
}

/// State kept in a JSON object on disk, rewritten atomically on every change
pub struct JsonStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> TrackbookResult<()> {
        let _guard = self.lock.lock().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire scheduler state lock: {}", e))
        })?;
        let mut values: BTreeMap<String, String> = read_json(&self.path)?;
        change(&mut values);
        write_json_atomic(&self.path, &values)
    }
}

impl StateStore for JsonStateStore {
    fn get(&self, key: &str) -> TrackbookResult<Option<String>> {
        let values: BTreeMap<String, String> = read_json(&self.path)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> TrackbookResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> TrackbookResult<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// In-memory state for tests
#[derive(Default)]
pub struct MemoryStateStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> TrackbookResult<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|e| TrackbookError::Storage(format!("state lock poisoned: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> TrackbookResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| TrackbookError::Storage(format!("state lock poisoned: {}", e)))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> TrackbookResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| TrackbookError::Storage(format!("state lock poisoned: {}", e)))?;
        values.remove(key);
        Ok(())
    }
}

/// Typed view over a [`StateStore`]
pub struct SchedulerState {
    store: Box<dyn StateStore>,
}

impl SchedulerState {
    pub fn new(store: Box<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn auto_backup_enabled(&self) -> TrackbookResult<bool> {
        self.get_flag(AUTO_BACKUP_ENABLED)
    }

    pub fn set_auto_backup_enabled(&self, enabled: bool) -> TrackbookResult<()> {
        self.set_flag(AUTO_BACKUP_ENABLED, enabled)
    }

    pub fn last_backup_success(&self) -> TrackbookResult<Option<DateTime<Utc>>> {
        self.get_timestamp(LAST_BACKUP_SUCCESS)
    }

    pub fn set_last_backup_success(&self, at: DateTime<Utc>) -> TrackbookResult<()> {
        self.store.set(LAST_BACKUP_SUCCESS, &at.to_rfc3339())
    }

    pub fn last_backup_attempt(&self) -> TrackbookResult<Option<DateTime<Utc>>> {
        self.get_timestamp(LAST_BACKUP_ATTEMPT)
    }

    pub fn set_last_backup_attempt(&self, at: DateTime<Utc>) -> TrackbookResult<()> {
        self.store.set(LAST_BACKUP_ATTEMPT, &at.to_rfc3339())
    }

    pub fn pending_retry(&self, task: TaskKind) -> TrackbookResult<bool> {
        self.get_flag(&pending_retry_key(task))
    }

    pub fn set_pending_retry(&self, task: TaskKind, pending: bool) -> TrackbookResult<()> {
        self.set_flag(&pending_retry_key(task), pending)
    }

    pub fn last_cleanup_date(&self) -> TrackbookResult<Option<NaiveDate>> {
        self.store
            .get(LAST_CLEANUP_DATE)?
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
                    TrackbookError::Storage(format!("Invalid {} value {:?}: {}", LAST_CLEANUP_DATE, raw, e))
                })
            })
            .transpose()
    }

    pub fn set_last_cleanup_date(&self, date: NaiveDate) -> TrackbookResult<()> {
        self.store
            .set(LAST_CLEANUP_DATE, &date.format(DATE_FORMAT).to_string())
    }

    pub fn phase(&self, task: TaskKind) -> TrackbookResult<TaskPhase> {
        Ok(self
            .store
            .get(&phase_key(task))?
            .and_then(|raw| TaskPhase::parse(&raw))
            .unwrap_or(TaskPhase::Unscheduled))
    }

    pub fn set_phase(&self, task: TaskKind, phase: TaskPhase) -> TrackbookResult<()> {
        self.store.set(&phase_key(task), phase.as_str())
    }

    /// A backup was started more recently than one last succeeded
    pub fn backup_interrupted(&self) -> TrackbookResult<bool> {
        Ok(match (self.last_backup_attempt()?, self.last_backup_success()?) {
            (Some(attempt), Some(success)) => attempt > success,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    fn get_flag(&self, key: &str) -> TrackbookResult<bool> {
        Ok(self.store.get(key)?.as_deref() == Some("true"))
    }

    fn set_flag(&self, key: &str, value: bool) -> TrackbookResult<()> {
        if value {
            self.store.set(key, "true")
        } else {
            self.store.remove(key)
        }
    }

    fn get_timestamp(&self, key: &str) -> TrackbookResult<Option<DateTime<Utc>>> {
        self.store
            .get(key)?
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        TrackbookError::Storage(format!("Invalid {} value {:?}: {}", key, raw, e))
                    })
            })
            .transpose()
    }
}

fn pending_retry_key(task: TaskKind) -> String {
    format!("{}.pending_retry", task.as_str())
}

fn phase_key(task: TaskKind) -> String {
    format!("{}.phase", task.as_str())
}
