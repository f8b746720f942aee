//! Coordinated access to the synchronized folder
//!
//! The cloud folder has a writer this process does not control: the sync
//! client, possibly acting for another device. Every read, write, delete and
//! listing of that folder goes through a [`FileCoordinator`].
//!
//! [`LockFileCoordinator`] approximates a platform file coordinator with an
//! advisory lock file in the target directory plus atomic
//! write-to-temp-then-rename, so a sync pass never observes a half-written
//! snapshot.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use crate::error::{TrackbookError, TrackbookResult};
use crate::storage::write_bytes_atomic;

/// Name of the advisory lock file placed in a coordinated directory
pub const LOCK_FILE_NAME: &str = ".trackbook.lock";

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Capability for touching files that an external writer may also touch
pub trait FileCoordinator: Send + Sync {
    /// Read a whole file under a read intent
    fn read(&self, path: &Path) -> TrackbookResult<Vec<u8>>;

    /// Replace a file's contents under a write intent; readers see either the
    /// old file or the complete new one
    fn write(&self, path: &Path, bytes: &[u8]) -> TrackbookResult<()>;

    /// Remove one file under a write intent
    fn delete(&self, path: &Path) -> TrackbookResult<()>;

    /// JSON files in `dir`, sorted by name; creates `dir` when missing
    fn list(&self, dir: &Path) -> TrackbookResult<Vec<PathBuf>>;
}

/// Lock-file based coordinator
pub struct LockFileCoordinator {
    /// Serializes this process's own threads before touching the lock file
    local: Mutex<()>,
    timeout: Duration,
    stale_after: Duration,
}

impl Default for LockFileCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(120))
    }
}

/// Held while a coordinated operation runs; removes the lock file on drop
struct DirectoryLock<'a> {
    lock_path: PathBuf,
    _local: MutexGuard<'a, ()>,
}

impl Drop for DirectoryLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            warn!(path = %self.lock_path.display(), error = %e, "failed to release lock file");
        }
    }
}

impl LockFileCoordinator {
    /// `timeout` bounds how long to wait for another holder; a lock file older
    /// than `stale_after` is considered abandoned and broken
    pub fn new(timeout: Duration, stale_after: Duration) -> Self {
        Self {
            local: Mutex::new(()),
            timeout,
            stale_after,
        }
    }

    fn lock(&self, dir: &Path) -> TrackbookResult<DirectoryLock<'_>> {
        let local = self.local.lock().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire coordinator lock: {}", e))
        })?;

        let lock_path = dir.join(LOCK_FILE_NAME);
        let deadline = Instant::now() + self.timeout;

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!(path = %lock_path.display(), "acquired directory lock");
                    return Ok(DirectoryLock {
                        lock_path,
                        _local: local,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if self.is_stale(&lock_path) {
                        warn!(path = %lock_path.display(), "breaking stale lock file");
                        let _ = fs::remove_file(&lock_path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(TrackbookError::Storage(format!(
                            "{} is locked by another writer",
                            dir.display()
                        )));
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => {
                    return Err(TrackbookError::Io(format!(
                        "Failed to create lock file {}: {}",
                        lock_path.display(),
                        e
                    )))
                }
            }
        }
    }

    fn is_stale(&self, lock_path: &Path) -> bool {
        fs::metadata(lock_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age > self.stale_after)
    }
}

fn parent_of(path: &Path) -> TrackbookResult<&Path> {
    path.parent().ok_or_else(|| {
        TrackbookError::Storage(format!("{} has no parent directory", path.display()))
    })
}

impl FileCoordinator for LockFileCoordinator {
    fn read(&self, path: &Path) -> TrackbookResult<Vec<u8>> {
        let _lock = self.lock(parent_of(path)?)?;
        fs::read(path)
            .map_err(|e| TrackbookError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> TrackbookResult<()> {
        let dir = parent_of(path)?;
        fs::create_dir_all(dir)?;
        let _lock = self.lock(dir)?;
        write_bytes_atomic(path, bytes)
    }

    fn delete(&self, path: &Path) -> TrackbookResult<()> {
        let _lock = self.lock(parent_of(path)?)?;
        fs::remove_file(path).map_err(|e| {
            TrackbookError::Io(format!("Failed to delete {}: {}", path.display(), e))
        })
    }

    fn list(&self, dir: &Path) -> TrackbookResult<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| {
            TrackbookError::Io(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        let _lock = self.lock(dir)?;

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_delete() {
        let temp_dir = TempDir::new().unwrap();
        let coordinator = LockFileCoordinator::default();
        let path = temp_dir.path().join("sync").join("a.json");

        coordinator.write(&path, b"{\"a\": 1}").unwrap();
        assert_eq!(coordinator.read(&path).unwrap(), b"{\"a\": 1}");
        assert!(!temp_dir.path().join("sync").join(LOCK_FILE_NAME).exists());

        coordinator.delete(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_list_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let coordinator = LockFileCoordinator::default();
        let dir = temp_dir.path().join("not-yet");

        assert!(coordinator.list(&dir).unwrap().is_empty());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_list_only_returns_json_files() {
        let temp_dir = TempDir::new().unwrap();
        let coordinator = LockFileCoordinator::default();
        fs::write(temp_dir.path().join("b.json"), "{}").unwrap();
        fs::write(temp_dir.path().join("a.json"), "{}").unwrap();
        fs::write(temp_dir.path().join("a.json.tmp"), "{}").unwrap();

        let listed = coordinator.list(temp_dir.path()).unwrap();
        assert_eq!(
            listed,
            vec![temp_dir.path().join("a.json"), temp_dir.path().join("b.json")]
        );
    }

    #[test]
    fn test_held_lock_times_out() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(LOCK_FILE_NAME), "4242").unwrap();

        let coordinator =
            LockFileCoordinator::new(Duration::from_millis(120), Duration::from_secs(3600));
        let result = coordinator.write(&temp_dir.path().join("a.json"), b"{}");
        assert!(matches!(result, Err(TrackbookError::Storage(_))));
        assert!(!temp_dir.path().join("a.json").exists());
    }

    #[test]
    fn test_stale_lock_is_broken() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(LOCK_FILE_NAME), "4242").unwrap();

        let coordinator = LockFileCoordinator::new(Duration::from_secs(5), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(20));
        coordinator
            .write(&temp_dir.path().join("a.json"), b"{}")
            .unwrap();
        assert!(temp_dir.path().join("a.json").exists());
    }
}
