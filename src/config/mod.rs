//! Configuration module for Trackbook
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence
//! - Retention and maintenance tuning

pub mod paths;
pub mod settings;

pub use paths::TrackbookPaths;
pub use settings::Settings;
