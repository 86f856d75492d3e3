//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Storage layout for the agent
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Get the rolling metrics history file path
    pub fn metrics_file(&self) -> File {
        File::new(self.base_dir.join("metrics-history.json"))
    }

    /// Get the ACL policy file path
    pub fn acl_file(&self) -> File {
        File::new(self.base_dir.join("acl.json"))
    }

    /// Get the directory holding timestamped ACL backups
    pub fn acl_backup_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("acl-backups"))
    }

    /// Get the logs directory
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), crate::errors::SentryError> {
        Dir::new(self.base_dir.clone()).create().await?;
        self.acl_backup_dir().create().await?;
        self.logs_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        // Use /etc/tailsentry on Linux, or the user home directory elsewhere
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/etc/tailsentry");

        #[cfg(not(target_os = "linux"))]
        let base_dir = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tailsentry");

        Self { base_dir }
    }
}
