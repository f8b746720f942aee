//! Background maintenance for Trackbook
//!
//! Two recurring tasks share one crash-safe shape:
//!
//! - `daily-cloud-backup`: encode the dataset and store it in the cloud folder
//! - `activity-log-cleanup`: drop old activity entries, at most once a day
//!
//! Tasks are described as [`TaskRequest`]s and handed to a [`TaskPort`].
//! Progress is written to a [`StateStore`] step by step, so an interrupted
//! run shows up on the next launch as "attempted but not succeeded".

mod maintenance;
mod queue;
mod state;
mod task;

pub use maintenance::{MaintenanceScheduler, SchedulerStatus};
pub use queue::{FileTaskQueue, ManualTaskQueue, TaskPort};
pub use state::{JsonStateStore, MemoryStateStore, SchedulerState, StateStore};
pub use task::{TaskContext, TaskKind, TaskOutcome, TaskPhase, TaskRequest};
