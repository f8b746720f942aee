//! Append-only activity log
//!
//! Each entry is written as a single JSON line and flushed immediately.
//! Pruning rewrites the file atomically with only the entries worth keeping.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{TrackbookError, TrackbookResult};
use crate::storage::write_bytes_atomic;

use super::entry::ActivityEntry;

/// Handles writing activity entries to the log file (JSONL)
pub struct ActivityLog {
    log_path: PathBuf,
    /// Serializes appends against a concurrent prune
    write_lock: Mutex<()>,
}

impl ActivityLog {
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            log_path,
            write_lock: Mutex::new(()),
        }
    }

    /// Append an entry
    pub fn record(&self, entry: &ActivityEntry) -> TrackbookResult<()> {
        let _guard = self.write_lock.lock().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire activity log lock: {}", e))
        })?;

        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| TrackbookError::Io(format!("Failed to open activity log: {}", e)))?;

        let json = serde_json::to_string(entry).map_err(|e| {
            TrackbookError::Json(format!("Failed to serialize activity entry: {}", e))
        })?;

        writeln!(file, "{}", json)
            .map_err(|e| TrackbookError::Io(format!("Failed to write activity entry: {}", e)))?;

        file.flush()
            .map_err(|e| TrackbookError::Io(format!("Failed to flush activity log: {}", e)))?;

        Ok(())
    }

    /// Append an entry, logging instead of failing
    ///
    /// History is secondary to the operation that produced it.
    pub fn record_quietly(&self, entry: ActivityEntry) {
        if let Err(e) = self.record(&entry) {
            warn!(error = %e, action = %entry.action, "failed to write activity log entry");
        }
    }

    /// Read all entries, oldest first
    ///
    /// Lines that do not parse (a write cut short by a crash) are skipped.
    pub fn read_all(&self) -> TrackbookResult<Vec<ActivityEntry>> {
        self.read_entries().map(|(entries, _)| entries)
    }

    /// Parsed entries plus the number of unreadable lines
    fn read_entries(&self) -> TrackbookResult<(Vec<ActivityEntry>, usize)> {
        if !self.log_path.exists() {
            return Ok((Vec::new(), 0));
        }

        let file = File::open(&self.log_path)
            .map_err(|e| TrackbookError::Io(format!("Failed to open activity log: {}", e)))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut skipped = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                TrackbookError::Io(format!(
                    "Failed to read activity log line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<ActivityEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(line = line_num + 1, error = %e, "skipping unreadable activity entry");
                    skipped += 1;
                }
            }
        }

        Ok((entries, skipped))
    }

    /// Read the most recent N entries
    pub fn read_recent(&self, count: usize) -> TrackbookResult<Vec<ActivityEntry>> {
        let all_entries = self.read_all()?;
        let start = all_entries.len().saturating_sub(count);
        Ok(all_entries[start..].to_vec())
    }

    /// Drop every entry older than `cutoff`; returns how many were removed
    ///
    /// Unreadable lines are dropped too but not counted.
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> TrackbookResult<usize> {
        let _guard = self.write_lock.lock().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire activity log lock: {}", e))
        })?;

        let (entries, skipped) = self.read_entries()?;
        let (keep, drop): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|e| e.timestamp >= cutoff);

        if drop.is_empty() && skipped == 0 {
            return Ok(0);
        }

        let mut contents = Vec::new();
        for entry in &keep {
            serde_json::to_writer(&mut contents, entry)?;
            contents.push(b'\n');
        }
        write_bytes_atomic(&self.log_path, &contents)?;

        Ok(drop.len())
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}
