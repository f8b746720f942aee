//! Path management for Trackbook
//!
//! Provides XDG-compliant path resolution for configuration, data, snapshots
//! and scheduler state.
//!
//! ## Path Resolution Order
//!
//! 1. `TRACKBOOK_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/trackbook` or `~/.config/trackbook`
//! 3. Windows: `%APPDATA%\trackbook`

use std::path::PathBuf;

use crate::error::TrackbookError;
use crate::snapshot::EntityKind;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "TRACKBOOK_DATA_DIR";

/// Manages all paths used by Trackbook
#[derive(Debug, Clone)]
pub struct TrackbookPaths {
    /// Base directory for all Trackbook data
    base_dir: PathBuf,
}

impl TrackbookPaths {
    /// Create a new TrackbookPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, TrackbookError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create TrackbookPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/trackbook/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory holding one JSON file per collection
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Private directory for pre-import safety snapshots (never cloud-synced)
    pub fn safety_backup_dir(&self) -> PathBuf {
        self.base_dir.join("safety_backups")
    }

    /// Scratch directory for manual exports
    pub fn export_dir(&self) -> PathBuf {
        self.base_dir.join("exports")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the activity log
    pub fn activity_log(&self) -> PathBuf {
        self.base_dir.join("activity.log")
    }

    /// Persisted scheduler key/value state
    pub fn scheduler_state_file(&self) -> PathBuf {
        self.base_dir.join("scheduler_state.json")
    }

    /// Pending deferred tasks
    pub fn task_queue_file(&self) -> PathBuf {
        self.base_dir.join("task_queue.json")
    }

    /// Get the path to the JSON file backing one entity collection
    pub fn collection_file(&self, kind: EntityKind) -> PathBuf {
        self.data_dir().join(format!("{}.json", kind.as_str()))
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), TrackbookError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| TrackbookError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| TrackbookError::Io(format!("Failed to create data directory: {}", e)))?;

        Ok(())
    }

    /// Check if Trackbook has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, TrackbookError> {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home).join("trackbook"));
    }
    let home = std::env::var("HOME")
        .map_err(|_| TrackbookError::Config("HOME environment variable not set".into()))?;
    Ok(PathBuf::from(home).join(".config").join("trackbook"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, TrackbookError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| TrackbookError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("trackbook"))
}
