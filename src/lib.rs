//! Trackbook - personal project tracker
//!
//! This library provides the backup and maintenance core of Trackbook: the
//! whole dataset (projects, checklists, expenses, ideas, notes, documents,
//! reminders, work logs) is serialized into one versioned snapshot document
//! that can be exported, imported with rollback, and kept as rotating
//! backups in a synchronized cloud folder.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `clock`: Time source, swappable in tests
//! - `models`: Core data models (projects, checklists, expenses, etc.)
//! - `storage`: JSON file storage layer and repository interfaces
//! - `activity`: Activity log of dataset-level operations
//! - `snapshot`: Snapshot document codec and local safety snapshots
//! - `transfer`: Export, import, restore and wipe with rollback
//! - `cloud`: Cloud backups with coordinated access and retention
//! - `scheduler`: Daily backup and log cleanup with crash-safe retry
//! - `cli`: Command handlers for the `trackbook` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use trackbook::cli::Services;
//! use trackbook::config::{paths::TrackbookPaths, settings::Settings};
//!
//! let paths = TrackbookPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let services = Services::open(paths, settings)?;
//! let exported = services.transfer.export()?;
//! ```

pub mod activity;
pub mod cli;
pub mod clock;
pub mod cloud;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod snapshot;
pub mod storage;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{TrackbookError, TrackbookResult};
