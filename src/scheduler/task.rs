//! Deferred task descriptions

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// The recurring maintenance tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "daily-cloud-backup")]
    DailyBackup,
    #[serde(rename = "activity-log-cleanup")]
    LogCleanup,
}

impl TaskKind {
    pub const ALL: [TaskKind; 2] = [TaskKind::DailyBackup, TaskKind::LogCleanup];

    /// Identifier used with the deferred-execution facility
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyBackup => "daily-cloud-backup",
            Self::LogCleanup => "activity-log-cleanup",
        }
    }

    /// Earliest time after `now` at which the task may fire again
    ///
    /// Both tasks recur at the next UTC day boundary.
    pub fn next_fire_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let tomorrow = now.date_naive() + Duration::days(1);
        tomorrow.and_time(NaiveTime::MIN).and_utc()
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one task type
///
/// `Unscheduled -> Scheduled -> Running -> Succeeded | Failed`, and back to
/// `Scheduled` when the next run is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Unscheduled,
    Scheduled,
    Running,
    Succeeded,
    Failed,
}

impl TaskPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unscheduled => "unscheduled",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unscheduled" => Some(Self::Unscheduled),
            "scheduled" => Some(Self::Scheduled),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to run `task` at or after `not_before`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task: TaskKind,
    pub not_before: DateTime<Utc>,
}

impl TaskRequest {
    pub fn new(task: TaskKind, not_before: DateTime<Utc>) -> Self {
        Self { task, not_before }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now
    }
}

/// Budget for one run, with the facility's expiration signal
#[derive(Debug)]
pub struct TaskContext {
    deadline: DateTime<Utc>,
    expired: AtomicBool,
}

impl TaskContext {
    pub fn new(deadline: DateTime<Utc>) -> Self {
        Self {
            deadline,
            expired: AtomicBool::new(false),
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Revoke the run
    pub fn expire(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expired.load(Ordering::SeqCst) || now >= self.deadline
    }
}

/// How a task run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    /// Nothing to do (already ran today, or the task is disabled)
    Skipped,
    Failed(String),
    /// The budget ran out before the work finished
    Expired,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            Self::Expired => write!(f, "expired"),
        }
    }
}
