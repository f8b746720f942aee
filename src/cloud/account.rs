//! Cloud availability
//!
//! Every cloud operation first asks the account for its container directory.
//! When nobody is signed in the answer is `CloudUnavailable`, before any
//! filesystem access is attempted.

use std::path::PathBuf;

use crate::error::{TrackbookError, TrackbookResult};

/// The externally synchronized identity
pub trait CloudAccount: Send + Sync {
    /// Root of the synchronized container, or `CloudUnavailable`
    fn container(&self) -> TrackbookResult<PathBuf>;
}

/// A sync client's local folder (Dropbox, iCloud Drive, Syncthing, ...)
///
/// Considered signed in when a folder is configured and currently present.
#[derive(Debug, Clone)]
pub struct SyncFolderAccount {
    root: Option<PathBuf>,
}

impl SyncFolderAccount {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

impl CloudAccount for SyncFolderAccount {
    fn container(&self) -> TrackbookResult<PathBuf> {
        let root = self.root.as_ref().ok_or_else(|| {
            TrackbookError::CloudUnavailable("no cloud folder is configured".into())
        })?;

        if !root.is_dir() {
            return Err(TrackbookError::CloudUnavailable(format!(
                "cloud folder {} is not reachable",
                root.display()
            )));
        }

        Ok(root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unconfigured_is_unavailable() {
        let account = SyncFolderAccount::new(None);
        assert!(matches!(
            account.container(),
            Err(TrackbookError::CloudUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_folder_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let account = SyncFolderAccount::new(Some(temp_dir.path().join("unmounted")));
        assert!(matches!(
            account.container(),
            Err(TrackbookError::CloudUnavailable(_))
        ));
    }

    #[test]
    fn test_present_folder_is_available() {
        let temp_dir = TempDir::new().unwrap();
        let account = SyncFolderAccount::new(Some(temp_dir.path().to_path_buf()));
        assert_eq!(account.container().unwrap(), temp_dir.path());
    }
}
