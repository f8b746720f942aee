//! User settings for Trackbook
//!
//! Manages user preferences, the location of the synchronized cloud folder,
//! and the retention limits applied to snapshots and the activity log.

use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::paths::TrackbookPaths;
use crate::cloud::RetentionPolicy;
use crate::error::TrackbookError;
use crate::models::UserPreferences;

/// Environment variable overriding the cloud folder location
pub const CLOUD_DIR_ENV: &str = "TRACKBOOK_CLOUD_DIR";

/// Settings for the externally synchronized backup folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudSettings {
    /// Root of the synchronized folder; `None` means no account is signed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Maximum number of cloud snapshots to keep
    #[serde(default = "default_cloud_max_count")]
    pub max_count: usize,

    /// Cloud snapshots older than this many days are deleted
    #[serde(default = "default_cloud_max_age_days")]
    pub max_age_days: i64,
}

impl CloudSettings {
    /// The retention policy described by these settings
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.max_count, Duration::days(self.max_age_days))
    }

    /// Cloud root after applying the environment override
    pub fn resolved_directory(&self) -> Option<PathBuf> {
        match std::env::var(CLOUD_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => Some(PathBuf::from(dir)),
            _ => self.directory.clone(),
        }
    }
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            directory: None,
            max_count: default_cloud_max_count(),
            max_age_days: default_cloud_max_age_days(),
        }
    }
}

/// Settings for background maintenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceSettings {
    /// Activity log entries older than this many days are pruned
    #[serde(default = "default_log_max_age_days")]
    pub activity_log_max_age_days: i64,

    /// Time budget granted to a background task run
    #[serde(default = "default_task_budget_secs")]
    pub task_budget_secs: i64,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            activity_log_max_age_days: default_log_max_age_days(),
            task_budget_secs: default_task_budget_secs(),
        }
    }
}

/// User settings for Trackbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Display preferences carried inside every snapshot
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Name recorded in snapshot metadata; falls back to the host name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    /// Cloud backup folder and retention
    #[serde(default)]
    pub cloud: CloudSettings,

    /// Local safety snapshots kept after a successful import
    #[serde(default = "default_safety_keep_count")]
    pub safety_keep_count: usize,

    /// Background maintenance tuning
    #[serde(default)]
    pub maintenance: MaintenanceSettings,
}

fn default_cloud_max_count() -> usize {
    5
}

fn default_cloud_max_age_days() -> i64 {
    30
}

fn default_safety_keep_count() -> usize {
    3
}

fn default_log_max_age_days() -> i64 {
    30
}

fn default_task_budget_secs() -> i64 {
    120
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preferences: UserPreferences::default(),
            device_name: None,
            cloud: CloudSettings::default(),
            safety_keep_count: default_safety_keep_count(),
            maintenance: MaintenanceSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &TrackbookPaths) -> Result<Self, TrackbookError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                TrackbookError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                TrackbookError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &TrackbookPaths) -> Result<(), TrackbookError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            TrackbookError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(paths.settings_file(), contents).map_err(|e| {
            TrackbookError::Io(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }

    /// Device name stamped into snapshot metadata
    pub fn resolved_device_name(&self) -> String {
        if let Some(name) = self.device_name.as_ref().filter(|n| !n.trim().is_empty()) {
            return name.clone();
        }
        ["HOSTNAME", "COMPUTERNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| "unknown-device".to_string())
    }

    /// Maximum age of activity log entries
    pub fn activity_log_max_age(&self) -> Duration {
        Duration::days(self.maintenance.activity_log_max_age_days)
    }

    /// Budget granted to one background task run
    pub fn task_budget(&self) -> Duration {
        Duration::seconds(self.maintenance.task_budget_secs)
    }
}
