//! Access to the user preferences that travel with snapshots

use crate::config::paths::TrackbookPaths;
use crate::config::settings::Settings;
use crate::error::TrackbookError;
use crate::models::UserPreferences;

/// Collaborator interface over user-preference storage
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<UserPreferences, TrackbookError>;
    fn store(&self, preferences: &UserPreferences) -> Result<(), TrackbookError>;
}

/// Preferences kept in the `preferences` section of `config.json`
pub struct SettingsPreferenceStore {
    paths: TrackbookPaths,
}

impl SettingsPreferenceStore {
    pub fn new(paths: TrackbookPaths) -> Self {
        Self { paths }
    }
}

impl PreferenceStore for SettingsPreferenceStore {
    fn load(&self) -> Result<UserPreferences, TrackbookError> {
        Ok(Settings::load_or_create(&self.paths)?.preferences)
    }

    fn store(&self, preferences: &UserPreferences) -> Result<(), TrackbookError> {
        let mut settings = Settings::load_or_create(&self.paths)?;
        if settings.preferences == *preferences && self.paths.is_initialized() {
            return Ok(());
        }
        settings.preferences = preferences.clone();
        settings.save(&self.paths)
    }
}
