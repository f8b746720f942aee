//! Activity log for Trackbook
//!
//! Records dataset-level events (exports, imports, rollbacks, cloud backups,
//! restores, wipes, cleanups) in an append-only JSONL file. The periodic
//! cleanup task keeps the file bounded by pruning entries past their
//! retention age.

mod entry;
mod logger;

pub use entry::{Action, ActivityEntry};
pub use logger::ActivityLog;
