//! Dataset lock shared by every process working on one data directory
//!
//! Each CLI invocation and every timer-fired `maintenance run-due` is its
//! own process, so the in-memory gate in the coordinator only covers one of
//! them. This lock lives on disk next to the data:
//!
//! - `locks/dataset.lock`: held by the one exclusive operation (import,
//!   restore, wipe); created with `create_new`
//! - `locks/readers/<id>.json`: one marker per shared holder (load, export,
//!   backup)
//!
//! Each side first publishes its own file and then looks for the other's, so
//! at least one of two racing callers sees the conflict and backs off with
//! `Busy`. Nothing waits. A lock whose process is gone, or that is older
//! than the stale limit, is broken.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{TrackbookError, TrackbookResult};

const LOCKS_DIR: &str = "locks";
const EXCLUSIVE_FILE: &str = "dataset.lock";
const READERS_DIR: &str = "readers";

/// Who holds a lock file
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    acquired_at: DateTime<Utc>,
    operation: String,
}

impl LockInfo {
    fn current(operation: &str) -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
            operation: operation.to_string(),
        }
    }
}

/// On-disk shared/exclusive lock over the live dataset
#[derive(Debug, Clone)]
pub struct DatasetLock {
    dir: PathBuf,
    stale_after: Duration,
}

/// A held lock; releases on drop
#[derive(Debug)]
pub struct DatasetGuard {
    path: PathBuf,
}

impl Drop for DatasetGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "released dataset lock"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to release dataset lock")
            }
        }
    }
}

enum Holder {
    Active(LockInfo),
    Gone,
}

impl DatasetLock {
    /// Lock files go under `base_dir/locks`
    pub fn new(base_dir: &Path) -> Self {
        Self {
            dir: base_dir.join(LOCKS_DIR),
            stale_after: Duration::minutes(30),
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    fn exclusive_path(&self) -> PathBuf {
        self.dir.join(EXCLUSIVE_FILE)
    }

    fn readers_dir(&self) -> PathBuf {
        self.dir.join(READERS_DIR)
    }

    /// Take the lock for an operation that replaces the dataset
    pub fn try_exclusive(&self, operation: &str) -> TrackbookResult<DatasetGuard> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| TrackbookError::Io(format!("Failed to create lock directory: {}", e)))?;

        let path = self.exclusive_path();
        let mut broke_abandoned = false;
        let guard = loop {
            match create_lock_file(&path, operation) {
                Ok(guard) => break guard,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => match self.inspect(&path) {
                    Holder::Gone if !broke_abandoned => broke_abandoned = true,
                    Holder::Gone => {
                        return Err(TrackbookError::Busy(format!(
                            "cannot {} while {} keeps reappearing",
                            operation,
                            path.display()
                        )))
                    }
                    Holder::Active(holder) => return Err(busy(operation, &holder)),
                },
                Err(e) => {
                    return Err(TrackbookError::Io(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        };

        if let Some(reader) = self.active_readers()?.into_iter().next() {
            drop(guard);
            return Err(busy(operation, &reader));
        }

        debug!(operation, "acquired exclusive dataset lock");
        Ok(guard)
    }

    /// Take the lock for an operation that only reads the dataset
    pub fn try_shared(&self, operation: &str) -> TrackbookResult<DatasetGuard> {
        self.refuse_if_exclusive(operation)?;

        let readers = self.readers_dir();
        fs::create_dir_all(&readers)
            .map_err(|e| TrackbookError::Io(format!("Failed to create lock directory: {}", e)))?;
        let path = readers.join(format!("{}.json", Uuid::new_v4()));
        let guard = create_lock_file(&path, operation).map_err(|e| {
            TrackbookError::Io(format!("Failed to create {}: {}", path.display(), e))
        })?;

        // an exclusive holder may have slipped in between the check and the marker
        if let Err(e) = self.refuse_if_exclusive(operation) {
            drop(guard);
            return Err(e);
        }

        debug!(operation, "acquired shared dataset lock");
        Ok(guard)
    }

    fn refuse_if_exclusive(&self, operation: &str) -> TrackbookResult<()> {
        let path = self.exclusive_path();
        if !path.exists() {
            return Ok(());
        }
        match self.inspect(&path) {
            Holder::Gone => Ok(()),
            Holder::Active(holder) => Err(busy(operation, &holder)),
        }
    }

    fn active_readers(&self) -> TrackbookResult<Vec<LockInfo>> {
        let dir = self.readers_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut active = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if let Holder::Active(info) = self.inspect(&path) {
                active.push(info);
            }
        }
        Ok(active)
    }

    /// Look at a lock file, removing it if its holder is gone
    fn inspect(&self, path: &Path) -> Holder {
        let info = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str::<LockInfo>(&contents).ok(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Holder::Gone,
            Err(_) => None,
        };

        // an unreadable file may be one being written right now
        let Some(info) = info else {
            return match fs::metadata(path).and_then(|m| m.modified()) {
                Ok(modified) if age_of(modified) > self.stale_after => {
                    self.break_lock(path, "unreadable");
                    Holder::Gone
                }
                _ => Holder::Active(LockInfo::current("unknown")),
            };
        };

        if !pid_is_alive(info.pid) {
            self.break_lock(path, "holder exited");
            return Holder::Gone;
        }
        if Utc::now() - info.acquired_at > self.stale_after {
            self.break_lock(path, "stale");
            return Holder::Gone;
        }
        Holder::Active(info)
    }

    fn break_lock(&self, path: &Path, reason: &str) {
        warn!(path = %path.display(), reason, "breaking abandoned dataset lock");
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove abandoned lock");
            }
        }
    }
}

fn create_lock_file(path: &Path, operation: &str) -> std::io::Result<DatasetGuard> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    let guard = DatasetGuard {
        path: path.to_path_buf(),
    };
    let info = serde_json::to_vec(&LockInfo::current(operation))
        .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
    file.write_all(&info)?;
    file.sync_all()?;
    Ok(guard)
}

fn busy(operation: &str, holder: &LockInfo) -> TrackbookError {
    TrackbookError::Busy(format!(
        "cannot {} while process {} is running {} (since {})",
        operation,
        holder.pid,
        holder.operation,
        holder.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
    ))
}

fn age_of(modified: std::time::SystemTime) -> Duration {
    std::time::SystemTime::now()
        .duration_since(modified)
        .ok()
        .and_then(|age| Duration::from_std(age).ok())
        .unwrap_or_else(Duration::zero)
}

#[cfg(target_os = "linux")]
fn pid_is_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_is_alive(_pid: u32) -> bool {
    // without a portable liveness check only the age limit applies
    true
}
