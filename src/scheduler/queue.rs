//! Deferred-execution port and its adapters
//!
//! [`TaskPort`] is the scheduler's view of the facility that runs a task at
//! or after a requested time. Submitting a task that is already queued
//! replaces the earlier request. A due request stays queued until it is
//! resubmitted or cancelled, so a run that dies halfway is fired again.
//!
//! - [`FileTaskQueue`]: requests persisted to a JSON file; an external timer
//!   (cron, systemd) runs `trackbook maintenance run-due` to fire them
//! - [`ManualTaskQueue`]: in-memory, for tests; can be told to reject
//!   submissions

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::task::{TaskKind, TaskRequest};
use crate::error::{TrackbookError, TrackbookResult};
use crate::storage::{read_json, write_json_atomic};

/// The deferred-execution facility
pub trait TaskPort: Send + Sync {
    /// Make a task known to the facility; required before submitting it
    fn register(&self, task: TaskKind) -> TrackbookResult<()>;

    /// Ask for `request.task` to run at or after `request.not_before`
    fn submit(&self, request: TaskRequest) -> TrackbookResult<()>;

    /// Drop any queued request for `task`
    fn cancel(&self, task: TaskKind) -> TrackbookResult<()>;

    /// Requests still waiting to fire
    fn pending(&self) -> TrackbookResult<Vec<TaskRequest>>;

    /// Every request that is due at `now`; they stay queued
    fn due(&self, now: DateTime<Utc>) -> TrackbookResult<Vec<TaskRequest>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueState {
    #[serde(default)]
    registered: BTreeSet<TaskKind>,
    #[serde(default)]
    pending: Vec<TaskRequest>,
}

impl QueueState {
    fn submit(&mut self, request: TaskRequest) -> TrackbookResult<()> {
        if !self.registered.contains(&request.task) {
            return Err(TrackbookError::Scheduler(format!(
                "task {} is not registered",
                request.task
            )));
        }
        self.pending.retain(|r| r.task != request.task);
        debug!(task = %request.task, not_before = %request.not_before, "queued task");
        self.pending.push(request);
        self.pending.sort_by_key(|r| (r.not_before, r.task));
        Ok(())
    }

    fn due(&self, now: DateTime<Utc>) -> Vec<TaskRequest> {
        self.pending
            .iter()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect()
    }
}

/// Task queue persisted as JSON
pub struct FileTaskQueue {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTaskQueue {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn with_state<R>(
        &self,
        change: impl FnOnce(&mut QueueState) -> TrackbookResult<R>,
    ) -> TrackbookResult<R> {
        let _guard = self.lock.lock().map_err(|e| {
            TrackbookError::Storage(format!("Failed to acquire task queue lock: {}", e))
        })?;
        let mut state: QueueState = read_json(&self.path)?;
        let result = change(&mut state)?;
        write_json_atomic(&self.path, &state)?;
        Ok(result)
    }
}

impl TaskPort for FileTaskQueue {
    fn register(&self, task: TaskKind) -> TrackbookResult<()> {
        self.with_state(|state| {
            state.registered.insert(task);
            Ok(())
        })
    }

    fn submit(&self, request: TaskRequest) -> TrackbookResult<()> {
        self.with_state(|state| state.submit(request))
    }

    fn cancel(&self, task: TaskKind) -> TrackbookResult<()> {
        self.with_state(|state| {
            state.pending.retain(|r| r.task != task);
            Ok(())
        })
    }

    fn pending(&self) -> TrackbookResult<Vec<TaskRequest>> {
        let state: QueueState = read_json(&self.path)?;
        Ok(state.pending)
    }

    fn due(&self, now: DateTime<Utc>) -> TrackbookResult<Vec<TaskRequest>> {
        let state: QueueState = read_json(&self.path)?;
        Ok(state.due(now))
    }
}

/// In-memory queue for tests
#[derive(Default)]
pub struct ManualTaskQueue {
    state: Mutex<QueueState>,
    reject_submissions: AtomicBool,
}

impl ManualTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `submit` fail, as a facility refusing work would
    pub fn set_reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::SeqCst);
    }

    fn lock(&self) -> TrackbookResult<std::sync::MutexGuard<'_, QueueState>> {
        self.state
            .lock()
            .map_err(|e| TrackbookError::Storage(format!("task queue lock poisoned: {}", e)))
    }
}

impl TaskPort for ManualTaskQueue {
    fn register(&self, task: TaskKind) -> TrackbookResult<()> {
        self.lock()?.registered.insert(task);
        Ok(())
    }

    fn submit(&self, request: TaskRequest) -> TrackbookResult<()> {
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(TrackbookError::Scheduler(format!(
                "submission of {} rejected",
                request.task
            )));
        }
        self.lock()?.submit(request)
    }

    fn cancel(&self, task: TaskKind) -> TrackbookResult<()> {
        self.lock()?.pending.retain(|r| r.task != task);
        Ok(())
    }

    fn pending(&self) -> TrackbookResult<Vec<TaskRequest>> {
        Ok(self.lock()?.pending.clone())
    }

    fn due(&self, now: DateTime<Utc>) -> TrackbookResult<Vec<TaskRequest>> {
        Ok(self.lock()?.due(now))
    }
}
